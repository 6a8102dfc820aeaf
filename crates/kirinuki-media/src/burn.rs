//! Burn caption markup and image overlays into a video.

use std::path::{Path, PathBuf};

use kirinuki_models::{EncodingConfig, OverlayDescriptor};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filter_graph::{FilterGraph, FilterGraphConfig, DEFAULT_FONTS_DIR};
use crate::metrics::record_overlay_skipped;

/// Everything composited onto the source video.
#[derive(Debug, Clone)]
pub struct BurnSpec {
    /// Caption markup file
    pub markup: PathBuf,
    /// Scrolling comment markup, burned after the captions
    pub danmaku_markup: Option<PathBuf>,
    /// Prefix-image and emoji overlays, painted last
    pub overlays: Vec<OverlayDescriptor>,
    pub fonts_dir: PathBuf,
    pub encoding: EncodingConfig,
    pub graph: FilterGraphConfig,
    /// Where a filter script goes when the graph is too long
    pub work_dir: PathBuf,
}

impl BurnSpec {
    pub fn new(markup: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            markup: markup.into(),
            danmaku_markup: None,
            overlays: Vec::new(),
            fonts_dir: PathBuf::from(DEFAULT_FONTS_DIR),
            encoding: EncodingConfig::for_burn(),
            graph: FilterGraphConfig::default(),
            work_dir: work_dir.into(),
        }
    }

    pub fn with_danmaku(mut self, markup: impl Into<PathBuf>) -> Self {
        self.danmaku_markup = Some(markup.into());
        self
    }

    pub fn with_overlays<I>(mut self, overlays: I) -> Self
    where
        I: IntoIterator<Item = OverlayDescriptor>,
    {
        self.overlays.extend(overlays);
        self
    }

    pub fn with_fonts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fonts_dir = dir.into();
        self
    }

    pub fn with_graph_config(mut self, graph: FilterGraphConfig) -> Self {
        self.graph = graph;
        self
    }

    /// Filter graph for this burn, skipping overlays whose image is missing.
    pub fn filter_graph(&self) -> FilterGraph {
        let mut graph = FilterGraph::new()
            .subtitles(&self.markup)
            .fonts_dir(&self.fonts_dir);
        if let Some(danmaku) = &self.danmaku_markup {
            graph = graph.subtitles(danmaku);
        }
        graph.overlays(available_overlays(&self.overlays))
    }
}

/// Overlays whose image exists; the rest are logged and dropped.
pub fn available_overlays(overlays: &[OverlayDescriptor]) -> Vec<OverlayDescriptor> {
    overlays
        .iter()
        .filter(|overlay| {
            if overlay.image_path.exists() {
                return true;
            }
            let error = MediaError::MissingOverlayAsset(overlay.image_path.clone());
            warn!(error = %error, start = overlay.start, "Skipping overlay");
            record_overlay_skipped();
            false
        })
        .cloned()
        .collect()
}

/// Burn `spec` into `input`, writing `output`. Audio is copied.
pub async fn burn_subtitles(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &BurnSpec,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if !spec.markup.exists() {
        return Err(MediaError::FileNotFound(spec.markup.clone()));
    }

    let graph = spec.filter_graph();
    let prepared = graph.prepare(&spec.graph, &spec.work_dir)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        danmaku = spec.danmaku_markup.is_some(),
        overlays = graph.overlay_count(),
        script = prepared.is_script(),
        "Burning subtitles"
    );

    let cmd = prepared
        .apply(FfmpegCommand::new(input, output).operation("burn"))
        .encoding(&spec.encoding);

    // `prepared` keeps any script file alive until the encoder exits
    runner.run(&cmd).await?;

    info!(output = %output.display(), "Subtitles burned");
    Ok(())
}
