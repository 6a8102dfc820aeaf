//! Burn edited captions (and optionally the chat) into a full video.

use std::collections::BTreeMap;
use std::path::PathBuf;

use kirinuki_media::subtitle::{build_caption_track, parse_cues};
use kirinuki_media::{burn_subtitles, BurnSpec};
use kirinuki_models::{filter_by_density, StyleAssignment, StyleBook, StyleSpec};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::sources::{density_or_default, render_danmaku, SourceFiles};

/// A caption burn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnJob {
    /// Source video file name inside the work directory
    pub video_filename: String,
    /// Edited caption track (WebVTT or SRT)
    pub subtitle_content: String,
    /// Style used by cues without an assignment
    #[serde(default)]
    pub styles: StyleSpec,
    /// Named styles
    #[serde(default)]
    pub saved_styles: BTreeMap<String, StyleSpec>,
    /// Cue index to style name
    #[serde(default)]
    pub style_map: StyleAssignment,
    #[serde(default)]
    pub with_danmaku: bool,
    /// Percentage of comments kept (0-100)
    #[serde(default)]
    pub danmaku_density: Option<u8>,
}

impl BurnJob {
    /// All styles of the request.
    pub fn style_book(&self) -> StyleBook {
        StyleBook {
            default: self.styles.clone(),
            named: self.saved_styles.clone(),
        }
    }

    /// Run the burn and return the output path.
    pub async fn run(&self, config: &WorkerConfig) -> WorkerResult<PathBuf> {
        let logger = JobLogger::new(&Uuid::new_v4(), "burn");
        let span = logger.create_span();
        let result = self.execute(config, &logger).instrument(span).await;
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn execute(&self, config: &WorkerConfig, logger: &JobLogger) -> WorkerResult<PathBuf> {
        let work_dir = &config.work_dir;
        let source = SourceFiles::locate(work_dir, &self.video_filename)?;
        logger.log_start(&source.base_name);

        let cue_path = source.output(work_dir, "_modified.vtt");
        tokio::fs::write(&cue_path, &self.subtitle_content).await?;
        let cues = parse_cues(&self.subtitle_content);

        let dimensions = source.dimensions().await;
        let track = build_caption_track(
            &cues,
            &self.style_book(),
            &self.style_map,
            dimensions.0,
            dimensions.1,
            &config.prefix_images_dir(),
        )?;
        let markup_path = source.output(work_dir, "_modified.ass");
        tokio::fs::write(&markup_path, &track.markup).await?;
        logger.log_progress(&format!(
            "{} cues, {} prefix images",
            cues.len(),
            track.overlays.len()
        ));

        let mut spec = BurnSpec::new(&markup_path, work_dir)
            .with_fonts_dir(&config.fonts_dir)
            .with_graph_config(config.filter_graph_config())
            .with_overlays(track.overlays);

        if self.with_danmaku {
            let comments = filter_by_density(
                &source.comments().await?,
                density_or_default(self.danmaku_density, config),
            );
            let emoji = source.emoji_map(&config.emoji_dir).await?;
            let danmaku_path = source.output(work_dir, "_danmaku.ass");
            match render_danmaku(&comments, dimensions, &emoji, &danmaku_path).await? {
                Some(danmaku) => spec = spec.with_danmaku(danmaku.markup).with_overlays(danmaku.overlays),
                None => logger.log_warning("No comments to scroll"),
            }
        }

        let output = source.output(work_dir, "_burned.mp4");
        burn_subtitles(&source.video, &output, &spec, &config.runner()).await?;

        logger.log_completion(&output.display().to_string());
        Ok(output)
    }
}
