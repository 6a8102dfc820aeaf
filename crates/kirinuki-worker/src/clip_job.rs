//! Cut one clip out of a source video.

use std::path::PathBuf;

use kirinuki_media::{extract_clip, ClipSpec};
use kirinuki_models::{comments_for_clip, AspectRatio, CropRect};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::sources::{density_or_default, render_danmaku, SourceFiles};

/// A clip request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipJob {
    pub video_filename: String,
    pub start: f64,
    pub end: f64,
    /// Used in the output file name
    #[serde(default)]
    pub title: String,
    pub crop_x: Option<f64>,
    pub crop_y: Option<f64>,
    pub crop_width: Option<f64>,
    pub crop_height: Option<f64>,
    #[serde(default)]
    pub with_danmaku: bool,
    #[serde(default)]
    pub danmaku_density: Option<u8>,
    /// "W:H"; only 9:16 changes the frame
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

impl ClipJob {
    /// Crop rectangle when both width and height are given.
    pub fn crop(&self) -> Option<CropRect> {
        let (width, height) = (self.crop_width?, self.crop_height?);
        let px = |v: f64| v.max(0.0).round() as u32;
        Some(CropRect::new(
            px(self.crop_x.unwrap_or(0.0)),
            px(self.crop_y.unwrap_or(0.0)),
            px(width),
            px(height),
        ))
    }

    pub fn aspect_ratio(&self) -> WorkerResult<Option<AspectRatio>> {
        self.aspect_ratio
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse().map_err(|e| WorkerError::invalid_job(format!("{e}"))))
            .transpose()
    }

    /// Run the cut and return the output path.
    pub async fn run(&self, config: &WorkerConfig) -> WorkerResult<PathBuf> {
        let logger = JobLogger::new(&Uuid::new_v4(), "clip");
        let span = logger.create_span();
        let result = self.execute(config, &logger).instrument(span).await;
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn execute(&self, config: &WorkerConfig, logger: &JobLogger) -> WorkerResult<PathBuf> {
        if self.end <= self.start {
            return Err(WorkerError::invalid_job(format!(
                "Clip end {:.3} is not after start {:.3}",
                self.end, self.start
            )));
        }
        let aspect_ratio = self.aspect_ratio()?;

        let work_dir = &config.work_dir;
        let source = SourceFiles::locate(work_dir, &self.video_filename)?;
        logger.log_start(&format!("{} {:.1}-{:.1}", source.base_name, self.start, self.end));

        let stem = format!("_clip_{}", sanitize_title(&self.title));
        let output = source.output(work_dir, &format!("{stem}.mp4"));

        let mut spec = ClipSpec::new(self.start, self.end, work_dir);
        spec.fonts_dir = config.fonts_dir.clone();
        spec.graph = config.filter_graph_config();
        if let Some(crop) = self.crop() {
            spec = spec.with_crop(crop);
        }
        if let Some(ratio) = aspect_ratio {
            spec = spec.with_aspect_ratio(ratio);
        }

        if self.with_danmaku {
            let density = density_or_default(self.danmaku_density, config);
            let comments = comments_for_clip(&source.comments().await?, self.start, self.end, density);
            let emoji = source.emoji_map(&config.emoji_dir).await?;
            let markup_path = source.output(work_dir, &format!("{stem}_danmaku.ass"));
            let frame = spec.frame_size(source.dimensions().await);
            match render_danmaku(&comments, frame, &emoji, &markup_path).await? {
                Some(danmaku) => spec = spec.with_danmaku(danmaku.markup, danmaku.overlays),
                None => logger.log_warning("No comments inside the clip"),
            }
        }

        extract_clip(&source.video, &output, &spec, &config.runner()).await?;

        logger.log_completion(&output.display().to_string());
        Ok(output)
    }
}

/// Keep alphanumerics, spaces, `-` and `_`, then trim.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}
