//! Clip extraction and merging.
//!
//! `extract_clip` cuts a time range with an optional crop, 9:16 letterbox,
//! scrolling comment burn and emoji overlays in a single encoder pass.
//! `merge_clips` concatenates finished clips without re-encoding.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use kirinuki_models::encoding::{VERTICAL_HEIGHT, VERTICAL_WIDTH};
use kirinuki_models::{AspectRatio, CropRect, EncodingConfig, OverlayDescriptor};
use tracing::info;

use crate::burn::available_overlays;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filter_graph::{FilterGraph, FilterGraphConfig, DEFAULT_FONTS_DIR};

/// What to cut and how to render it.
#[derive(Debug, Clone)]
pub struct ClipSpec {
    pub start: f64,
    pub end: f64,
    pub crop: Option<CropRect>,
    /// Only 9:16 changes the output; other ratios keep the source frame
    pub aspect_ratio: Option<AspectRatio>,
    /// Scrolling comment markup in clip time
    pub danmaku_markup: Option<PathBuf>,
    /// Emoji overlays in clip time
    pub overlays: Vec<OverlayDescriptor>,
    pub fonts_dir: PathBuf,
    pub encoding: EncodingConfig,
    pub graph: FilterGraphConfig,
    pub work_dir: PathBuf,
}

impl ClipSpec {
    pub fn new(start: f64, end: f64, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            start,
            end,
            crop: None,
            aspect_ratio: None,
            danmaku_markup: None,
            overlays: Vec::new(),
            fonts_dir: PathBuf::from(DEFAULT_FONTS_DIR),
            encoding: EncodingConfig::for_clip(),
            graph: FilterGraphConfig::default(),
            work_dir: work_dir.into(),
        }
    }

    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn with_danmaku<I>(mut self, markup: impl Into<PathBuf>, overlays: I) -> Self
    where
        I: IntoIterator<Item = OverlayDescriptor>,
    {
        self.danmaku_markup = Some(markup.into());
        self.overlays.extend(overlays);
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_vertical(&self) -> bool {
        self.aspect_ratio == Some(AspectRatio::PORTRAIT)
    }

    /// Frame the markup and overlays are drawn on, after crop and letterbox.
    ///
    /// Scrolling comments must be scheduled in this space so that emoji
    /// overlays and the subtitle renderer share one coordinate system.
    pub fn frame_size(&self, (width, height): (u32, u32)) -> (u32, u32) {
        if self.is_vertical() {
            return (VERTICAL_WIDTH, VERTICAL_HEIGHT);
        }
        match self.crop {
            Some(crop) if crop.is_valid() => (crop.width, crop.height),
            _ => (width, height),
        }
    }

    /// Filter graph for this clip; overlays with missing images are dropped.
    pub fn filter_graph(&self) -> FilterGraph {
        let mut graph = FilterGraph::new().fonts_dir(&self.fonts_dir);
        if let Some(crop) = self.crop {
            graph = graph.crop(crop);
        }
        if self.is_vertical() {
            graph = graph.letterbox(VERTICAL_WIDTH, VERTICAL_HEIGHT);
        }
        if let Some(markup) = &self.danmaku_markup {
            graph = graph.subtitles(markup);
        }
        graph.overlays(available_overlays(&self.overlays))
    }
}

/// Cut `spec`'s range out of `input` into `output`, re-encoding.
pub async fn extract_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &ClipSpec,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if spec.duration() <= 0.0 {
        return Err(MediaError::InvalidVideo(format!(
            "Clip range is empty: {:.3}-{:.3}",
            spec.start, spec.end
        )));
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        start = spec.start,
        duration = spec.duration(),
        vertical = spec.is_vertical(),
        danmaku = spec.danmaku_markup.is_some(),
        "Extracting clip"
    );

    let graph = spec.filter_graph();
    let cmd = FfmpegCommand::new(input, output)
        .operation("clip")
        .seek(spec.start)
        .duration(spec.duration());

    // Plain chains go through -vf; overlays need the labelled graph
    let prepared = if graph.overlay_count() > 0 {
        Some(graph.prepare(&spec.graph, &spec.work_dir)?)
    } else {
        None
    };
    let cmd = match (&prepared, graph.to_simple_chain()) {
        (Some(prepared), _) => prepared.apply(cmd),
        (None, Some(chain)) => cmd.video_filter(chain),
        (None, None) => cmd,
    };
    let cmd = cmd.encoding(&spec.encoding);

    runner.run(&cmd).await?;

    info!(output = %output.display(), "Clip extracted");
    Ok(())
}

/// Concatenate clips into `output` without re-encoding.
///
/// All clips must share codecs and resolution, as produced by
/// `extract_clip` with the same settings.
pub async fn merge_clips(clips: &[PathBuf], output: impl AsRef<Path>, runner: &FfmpegRunner) -> MediaResult<()> {
    let output = output.as_ref();

    if clips.is_empty() {
        return Err(MediaError::InvalidVideo("No clips to merge".to_string()));
    }
    if let Some(missing) = clips.iter().find(|c| !c.exists()) {
        return Err(MediaError::FileNotFound(missing.clone()));
    }

    let temp_dir = tempfile::tempdir()?;
    let list_path = temp_dir.path().join("concat.txt");
    tokio::fs::write(&list_path, concat_list(clips)).await?;

    info!(clips = clips.len(), output = %output.display(), "Merging clips");

    let cmd = FfmpegCommand::new(&list_path, output)
        .operation("merge")
        .input_args(["-f", "concat", "-safe", "0"])
        .stream_copy();
    runner.run(&cmd).await?;

    info!(output = %output.display(), "Clips merged");
    Ok(())
}

/// Concat demuxer list, one `file '<path>'` line per clip.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clips {
        // Quotes inside a quoted entry are written as '\''
        let escaped = clip.to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(out, "file '{escaped}'");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use kirinuki_models::CommentEvent;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::emoji::EmojiMap;
    use crate::filter_graph::FilterNode;
    use crate::subtitle::{schedule_danmaku, write_danmaku_markup, DanmakuConfig};

    #[test]
    fn test_clip_graph_order() {
        let spec = ClipSpec::new(10.0, 40.0, "/tmp")
            .with_crop(CropRect::new(0, 0, 960, 1080))
            .with_aspect_ratio(AspectRatio::PORTRAIT)
            .with_danmaku("/w/danmaku.ass", Vec::new());

        let nodes = spec.filter_graph().nodes();
        assert!(matches!(nodes[0], FilterNode::Crop(_)));
        assert!(matches!(nodes[1], FilterNode::Letterbox { width: 720, height: 1280 }));
        assert!(matches!(nodes[2], FilterNode::Subtitles { .. }));
        assert_eq!(spec.duration(), 30.0);
    }

    #[test]
    fn test_landscape_ratio_keeps_frame() {
        let spec = ClipSpec::new(0.0, 5.0, "/tmp").with_aspect_ratio(AspectRatio::LANDSCAPE);
        assert!(!spec.is_vertical());
        assert!(spec.filter_graph().is_empty());
    }

    #[test]
    fn test_frame_size() {
        let source = (1920, 1080);
        let spec = ClipSpec::new(0.0, 5.0, "/tmp");
        assert_eq!(spec.frame_size(source), (1920, 1080));

        let cropped = spec.clone().with_crop(CropRect::new(480, 0, 960, 1080));
        assert_eq!(cropped.frame_size(source), (960, 1080));
        assert_eq!(
            cropped.with_aspect_ratio(AspectRatio::PORTRAIT).frame_size(source),
            (720, 1280)
        );
        assert_eq!(
            spec.with_crop(CropRect::new(0, 0, 0, 0)).frame_size(source),
            (1920, 1080)
        );
    }

    #[test]
    fn test_vertical_emoji_follows_its_comment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kusa.png"), b"png").unwrap();
        let emoji = EmojiMap::new(dir.path(), HashMap::from([(":_kusa:".to_string(), "kusa.png".to_string())]));

        let spec = ClipSpec::new(0.0, 30.0, dir.path()).with_aspect_ratio(AspectRatio::PORTRAIT);
        let (width, height) = spec.frame_size((1920, 1080));
        let config = DanmakuConfig::default();
        let comments = vec![CommentEvent::new(":_kusa: w", 2.0)];
        let track = schedule_danmaku(&comments, width, height, &config, &emoji, &mut StdRng::seed_from_u64(1));

        let markup = write_danmaku_markup(&track, width, height, &config);
        assert!(markup.contains("PlayResX: 720\nPlayResY: 1280"));

        // Text and image start together just off the right edge of the output frame
        let comment = &track.comments[0];
        let overlay = &track.overlays[0];
        assert_eq!(comment.start_x, 720.0 + config.buffer);
        assert!(overlay.x_expr.starts_with(&format!("{:.1}-(t-2.000)", comment.start_x)));
        assert!(overlay.x_expr.ends_with("+0"));
        assert_eq!(overlay.y, comment.y);
        assert!(overlay.y >= (1280.0 * config.top_margin_ratio) as i64);
        assert!(overlay.y + i64::from(overlay.size) <= 1280);
    }

    #[test]
    fn test_concat_list() {
        let list = concat_list(&[PathBuf::from("/a/one.mp4"), PathBuf::from("/a/it's.mp4")]);
        assert_eq!(list, "file '/a/one.mp4'\nfile '/a/it'\\''s.mp4'\n");
    }

    #[tokio::test]
    async fn test_empty_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"").unwrap();
        let spec = ClipSpec::new(5.0, 5.0, dir.path());
        let result = extract_clip(&input, dir.path().join("out.mp4"), &spec, &FfmpegRunner::new()).await;
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }

    #[tokio::test]
    async fn test_merge_requires_clips() {
        let result = merge_clips(&[], "/tmp/out.mp4", &FfmpegRunner::new()).await;
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }
}
