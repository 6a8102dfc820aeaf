//! Files that sit next to a source video in the work directory, and the
//! scrolling comment track built from them.
//!
//! For `abc.mp4` the downloader leaves `abc.live_chat.json` (chat replay)
//! and `abc.info.json` (metadata with `channel_id` and sometimes a
//! `comments` array).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kirinuki_media::subtitle::{generate_danmaku, write_danmaku_markup, DanmakuConfig};
use kirinuki_media::{load_comments, probe_video, EmojiMap};
use kirinuki_models::{CommentEvent, OverlayDescriptor};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Size assumed when the source cannot be probed.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (1920, 1080);

/// A source video and its sidecar files.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub base_name: String,
    pub video: PathBuf,
    pub live_chat: PathBuf,
    pub info_json: PathBuf,
}

impl SourceFiles {
    /// Locate `video_filename` inside `work_dir`; the video must exist.
    pub fn locate(work_dir: &Path, video_filename: &str) -> WorkerResult<Self> {
        let file_name = Path::new(video_filename)
            .file_name()
            .ok_or_else(|| WorkerError::invalid_job(format!("Bad video filename: {video_filename}")))?;
        let video = work_dir.join(file_name);
        if !video.exists() {
            return Err(WorkerError::job_failed(format!("Video not found: {}", video.display())));
        }

        let base_name = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            live_chat: work_dir.join(format!("{base_name}.live_chat.json")),
            info_json: work_dir.join(format!("{base_name}.info.json")),
            base_name,
            video,
        })
    }

    /// Sibling output path `<base><suffix>`.
    pub fn output(&self, work_dir: &Path, suffix: &str) -> PathBuf {
        work_dir.join(format!("{}{}", self.base_name, suffix))
    }

    /// Viewer comments from the chat replay or the info file.
    pub async fn comments(&self) -> WorkerResult<Vec<CommentEvent>> {
        Ok(load_comments(&self.live_chat, &self.info_json).await?)
    }

    /// Channel the video belongs to, if the info file names one.
    pub async fn channel_id(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Info {
            channel_id: Option<String>,
        }

        let content = tokio::fs::read_to_string(&self.info_json).await.ok()?;
        match serde_json::from_str::<Info>(&content) {
            Ok(info) => info.channel_id.filter(|c| !c.is_empty()),
            Err(e) => {
                warn!(path = %self.info_json.display(), error = %e, "Unreadable info file");
                None
            }
        }
    }

    /// Emoji images of the video's channel; empty when there is no map.
    pub async fn emoji_map(&self, emoji_dir: &Path) -> WorkerResult<EmojiMap> {
        match self.channel_id().await {
            Some(channel) => Ok(EmojiMap::load(emoji_dir, &channel).await?),
            None => {
                debug!(video = %self.base_name, "No channel id, emoji shortcuts stay text");
                Ok(EmojiMap::new(emoji_dir, HashMap::new()))
            }
        }
    }

    /// Probed frame size, or [`FALLBACK_DIMENSIONS`].
    pub async fn dimensions(&self) -> (u32, u32) {
        match probe_video(&self.video).await {
            Ok(info) if info.has_dimensions() => (info.width, info.height),
            Ok(_) => FALLBACK_DIMENSIONS,
            Err(e) => {
                warn!(video = %self.video.display(), error = %e, "Probe failed, assuming 1920x1080");
                FALLBACK_DIMENSIONS
            }
        }
    }
}

/// A rendered scrolling comment track.
#[derive(Debug, Clone)]
pub struct DanmakuOutput {
    pub markup: PathBuf,
    pub overlays: Vec<OverlayDescriptor>,
}

/// Schedule `comments` and write their markup to `markup_path`.
///
/// Returns `None` when there is nothing to show.
pub async fn render_danmaku(
    comments: &[CommentEvent],
    (width, height): (u32, u32),
    emoji: &EmojiMap,
    markup_path: &Path,
) -> WorkerResult<Option<DanmakuOutput>> {
    if comments.is_empty() {
        return Ok(None);
    }

    let config = DanmakuConfig::default();
    let track = generate_danmaku(comments, width, height, &config, emoji);
    tokio::fs::write(markup_path, write_danmaku_markup(&track, width, height, &config)).await?;

    info!(
        comments = track.comments.len(),
        lanes = track.lane_count,
        emoji = track.overlays.len(),
        busy_lanes = track.fallback_count(),
        path = %markup_path.display(),
        "Danmaku track written"
    );

    Ok(Some(DanmakuOutput {
        markup: markup_path.to_path_buf(),
        overlays: track.overlays,
    }))
}

/// Job density, falling back to the configured one.
pub fn density_or_default(density: Option<u8>, config: &WorkerConfig) -> u8 {
    density.unwrap_or(config.danmaku_density).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.mp4"), b"").unwrap();

        let files = SourceFiles::locate(dir.path(), "abc.mp4").unwrap();
        assert_eq!(files.base_name, "abc");
        assert_eq!(files.live_chat, dir.path().join("abc.live_chat.json"));
        assert_eq!(files.output(dir.path(), "_burned.mp4"), dir.path().join("abc_burned.mp4"));

        // Path components are stripped
        assert!(SourceFiles::locate(dir.path(), "../abc.mp4").is_ok());
        assert!(matches!(
            SourceFiles::locate(dir.path(), "missing.mp4"),
            Err(WorkerError::JobFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_emoji_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("v.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("v.info.json"), r#"{"channel_id":"UC1"}"#).unwrap();
        let emoji_dir = dir.path().join("emojis");
        std::fs::create_dir_all(emoji_dir.join("UC1")).unwrap();
        std::fs::write(emoji_dir.join("UC1/map.json"), r#"{":a:":"a.png"}"#).unwrap();

        let files = SourceFiles::locate(dir.path(), "v.mp4").unwrap();
        assert_eq!(files.channel_id().await.as_deref(), Some("UC1"));
        assert_eq!(files.emoji_map(&emoji_dir).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_render_danmaku() {
        let dir = tempfile::tempdir().unwrap();
        let emoji = EmojiMap::new(dir.path(), HashMap::new());
        let path = dir.path().join("d.ass");

        assert!(render_danmaku(&[], (1920, 1080), &emoji, &path).await.unwrap().is_none());

        let comments = vec![CommentEvent::new("hi", 1.0)];
        let output = render_danmaku(&comments, (1920, 1080), &emoji, &path).await.unwrap().unwrap();
        assert!(output.overlays.is_empty());
        let markup = std::fs::read_to_string(&output.markup).unwrap();
        assert!(markup.contains("\\move("));
    }

    #[test]
    fn test_density_default() {
        let config = WorkerConfig::default();
        assert_eq!(density_or_default(None, &config), 10);
        assert_eq!(density_or_default(Some(200), &config), 100);
    }
}
