//! FFmpeg filter graph for caption burn-in and image overlays.
//!
//! The graph is kept as ordered nodes and only serialized when the command
//! is built. Node order is fixed: crop, letterbox, subtitle burns (main
//! captions first), then image overlays so icons paint over caption boxes.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use kirinuki_models::{CropRect, OverlayDescriptor};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Fonts directory handed to the subtitle renderer.
pub const DEFAULT_FONTS_DIR: &str = "/usr/share/fonts/";

/// Label of the composed video stream.
pub const OUTPUT_LABEL: &str = "vout";

/// When a graph goes to a script file instead of the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraphConfig {
    /// Longest graph passed inline
    pub max_inline_len: usize,
    /// Most overlays passed inline
    pub max_inline_overlays: usize,
}

impl Default for FilterGraphConfig {
    fn default() -> Self {
        Self {
            max_inline_len: 4096,
            max_inline_overlays: 16,
        }
    }
}

impl FilterGraphConfig {
    pub fn with_max_inline_len(mut self, len: usize) -> Self {
        self.max_inline_len = len;
        self
    }

    pub fn with_max_inline_overlays(mut self, count: usize) -> Self {
        self.max_inline_overlays = count;
        self
    }
}

/// One processing step on the video stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Crop(CropRect),
    /// Fit inside the frame and pad the rest black
    Letterbox { width: u32, height: u32 },
    Subtitles {
        path: PathBuf,
        fonts_dir: Option<PathBuf>,
    },
    Overlay(OverlayDescriptor),
}

impl FilterNode {
    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::Overlay(_))
    }
}

impl fmt::Display for FilterNode {
    /// Single-stream form; overlays render their `overlay` filter only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crop(rect) => write!(f, "{}", rect.to_filter()),
            Self::Letterbox { width, height } => write!(
                f,
                "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
                w = width,
                h = height
            ),
            Self::Subtitles { path, fonts_dir } => {
                write!(f, "subtitles={}", quote_filter_path(&path.to_string_lossy()))?;
                if let Some(dir) = fonts_dir {
                    write!(f, ":fontsdir={}", quote_filter_path(&dir.to_string_lossy()))?;
                }
                Ok(())
            }
            Self::Overlay(overlay) => write!(
                f,
                "overlay=x='{}':y={}:enable='gte(t,{:.3})*lt(t,{:.3})'",
                overlay.x_expr, overlay.y, overlay.start, overlay.end
            ),
        }
    }
}

/// Ordered video filter graph over input `0:v`.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    crop: Option<CropRect>,
    letterbox: Option<(u32, u32)>,
    subtitles: Vec<PathBuf>,
    overlays: Vec<OverlayDescriptor>,
    fonts_dir: Option<PathBuf>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crop(mut self, rect: CropRect) -> Self {
        if rect.is_valid() {
            self.crop = Some(rect);
        }
        self
    }

    pub fn letterbox(mut self, width: u32, height: u32) -> Self {
        self.letterbox = Some((width, height));
        self
    }

    /// Burn a markup file; files burn in the order they are added.
    pub fn subtitles(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitles.push(path.into());
        self
    }

    pub fn fonts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fonts_dir = Some(dir.into());
        self
    }

    /// Add image overlays; those with an empty window are dropped.
    pub fn overlays<I>(mut self, overlays: I) -> Self
    where
        I: IntoIterator<Item = OverlayDescriptor>,
    {
        self.overlays.extend(overlays.into_iter().filter(|o| o.is_visible()));
        self
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Nodes in processing order.
    pub fn nodes(&self) -> Vec<FilterNode> {
        let mut nodes = Vec::new();
        nodes.extend(self.crop.map(FilterNode::Crop));
        nodes.extend(
            self.letterbox
                .map(|(width, height)| FilterNode::Letterbox { width, height }),
        );
        nodes.extend(self.subtitles.iter().map(|path| FilterNode::Subtitles {
            path: path.clone(),
            fonts_dir: self.fonts_dir.clone(),
        }));
        nodes.extend(self.overlays.iter().cloned().map(FilterNode::Overlay));
        nodes
    }

    /// Comma-joined chain for `-vf`; only valid without overlays.
    pub fn to_simple_chain(&self) -> Option<String> {
        if !self.overlays.is_empty() {
            return None;
        }
        let nodes = self.nodes();
        if nodes.is_empty() {
            return None;
        }
        Some(
            nodes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Full `-filter_complex` text ending at `[vout]`.
    pub fn to_filter_complex(&self) -> String {
        let nodes = self.nodes();
        let chain: Vec<String> = nodes
            .iter()
            .filter(|n| !n.is_overlay())
            .map(ToString::to_string)
            .collect();

        let mut parts = Vec::new();
        let mut current = "0:v".to_string();

        if !chain.is_empty() || self.overlays.is_empty() {
            let body = if chain.is_empty() {
                "null".to_string()
            } else {
                chain.join(",")
            };
            let label = if self.overlays.is_empty() {
                OUTPUT_LABEL.to_string()
            } else {
                "v0".to_string()
            };
            parts.push(format!("[{current}]{body}[{label}]"));
            current = label;
        }

        let last = self.overlays.len().saturating_sub(1);
        for (i, overlay) in self.overlays.iter().enumerate() {
            let image = format!("img{i}");
            let next = if i == last {
                OUTPUT_LABEL.to_string()
            } else {
                format!("v{}", i + 1)
            };
            parts.push(format!(
                "movie={},scale={s}:{s}[{image}]",
                quote_filter_path(&overlay.image_path.to_string_lossy()),
                s = overlay.size
            ));
            parts.push(format!(
                "[{current}][{image}]{}[{next}]",
                FilterNode::Overlay(overlay.clone())
            ));
            current = next;
        }

        parts.join(";")
    }

    /// Serialize for a command, spilling to a script file when too large.
    ///
    /// `script_dir` receives the script file, which lives as long as the
    /// returned value.
    pub fn prepare(&self, config: &FilterGraphConfig, script_dir: &Path) -> MediaResult<PreparedFilter> {
        let graph = self.to_filter_complex();
        if graph.len() <= config.max_inline_len && self.overlays.len() <= config.max_inline_overlays {
            return Ok(PreparedFilter::Inline(graph));
        }

        let script = write_filter_script(&graph, script_dir)?;
        debug!(
            path = %script.path().display(),
            len = graph.len(),
            overlays = self.overlays.len(),
            "Filter graph written to script file"
        );
        Ok(PreparedFilter::Script(script))
    }
}

/// Serialized graph ready to attach to a command.
#[derive(Debug)]
pub enum PreparedFilter {
    Inline(String),
    Script(NamedTempFile),
}

impl PreparedFilter {
    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    /// Attach the graph and map its output plus any source audio.
    pub fn apply(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        let cmd = match self {
            Self::Inline(graph) => cmd.filter_complex(graph.clone()),
            Self::Script(file) => cmd.filter_complex_script(file.path()),
        };
        let video = format!("[{OUTPUT_LABEL}]");
        cmd.output_args(["-map", video.as_str(), "-map", "0:a?"])
    }
}

fn write_filter_script(graph: &str, dir: &Path) -> MediaResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("filter_")
        .suffix(".txt")
        .tempfile_in(dir)
        .map_err(|e| MediaError::filter_script_write(dir, e))?;
    file.write_all(graph.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| MediaError::filter_script_write(file.path(), e))?;
    Ok(file)
}

/// Escape a path for the filter option parser (`:` separates options).
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('\'', "\\'").replace(':', "\\:")
}

/// Quote an option-escaped path for the graph parser.
///
/// The graph parser keeps backslashes inside quotes literally, so every
/// quote of the escaped path is written as `'\''` (close, escaped quote,
/// reopen).
pub fn quote_filter_path(path: &str) -> String {
    format!("'{}'", escape_filter_path(path).replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emoji(i: usize) -> OverlayDescriptor {
        OverlayDescriptor {
            image_path: PathBuf::from(format!("/emoji/e{i}.png")),
            start: i as f64,
            end: i as f64 + 5.0,
            x_expr: "100-(t-1)*10".to_string(),
            y: 40,
            size: 48,
        }
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path("/tmp/a:b.ass"), "/tmp/a\\:b.ass");
        assert_eq!(escape_filter_path("/tmp/it's.ass"), "/tmp/it\\'s.ass");
        assert_eq!(escape_filter_path("C:\\x.ass"), "C\\:\\\\x.ass");
    }

    /// Two-level unescape as the graph parser and then the option parser
    /// apply it: quotes group literally, a backslash outside quotes escapes
    /// the next character.
    fn unescape_level(s: &str) -> String {
        let mut out = String::new();
        let mut quoted = false;
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => out.extend(chars.next()),
                c => out.push(c),
            }
        }
        out
    }

    #[test]
    fn test_quote_filter_path_survives_both_parsers() {
        for path in ["/w/it's_burned.ass", "/tmp/a:b.ass", "C:\\x.ass", "/w/plain.ass", "/w/'quoted'\\dir"] {
            let quoted = quote_filter_path(path);
            assert_eq!(unescape_level(&unescape_level(&quoted)), path, "{quoted}");
        }
        assert_eq!(quote_filter_path("/w/it's.ass"), "'/w/it\\'\\''s.ass'");
    }

    #[test]
    fn test_quoted_path_in_graph() {
        let graph = FilterGraph::new().subtitles("/w/it's_burned.ass");
        assert_eq!(
            graph.to_simple_chain().unwrap(),
            "subtitles='/w/it\\'\\''s_burned.ass'"
        );
    }

    #[test]
    fn test_simple_chain_order() {
        let graph = FilterGraph::new()
            .subtitles("/w/danmaku.ass")
            .letterbox(720, 1280)
            .crop(CropRect::new(10, 20, 640, 360));
        assert_eq!(
            graph.to_simple_chain().unwrap(),
            "crop=640:360:10:20,scale=720:1280:force_original_aspect_ratio=decrease,pad=720:1280:(ow-iw)/2:(oh-ih)/2,subtitles='/w/danmaku.ass'"
        );
    }

    #[test]
    fn test_invalid_crop_is_ignored() {
        let graph = FilterGraph::new().crop(CropRect::new(0, 0, 0, 100));
        assert!(graph.is_empty());
        assert_eq!(graph.to_filter_complex(), "[0:v]null[vout]");
    }

    #[test]
    fn test_filter_complex_with_overlays() {
        let graph = FilterGraph::new()
            .subtitles("/w/main.ass")
            .subtitles("/w/danmaku.ass")
            .fonts_dir(DEFAULT_FONTS_DIR)
            .overlays([emoji(1), emoji(2)]);

        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]subtitles='/w/main.ass':fontsdir='/usr/share/fonts/',subtitles='/w/danmaku.ass':fontsdir='/usr/share/fonts/'[v0];\
             movie='/emoji/e1.png',scale=48:48[img0];\
             [v0][img0]overlay=x='100-(t-1)*10':y=40:enable='gte(t,1.000)*lt(t,6.000)'[v1];\
             movie='/emoji/e2.png',scale=48:48[img1];\
             [v1][img1]overlay=x='100-(t-1)*10':y=40:enable='gte(t,2.000)*lt(t,7.000)'[vout]"
        );
        assert!(graph.to_simple_chain().is_none());
    }

    #[test]
    fn test_overlays_only() {
        let graph = FilterGraph::new().overlays([emoji(0)]);
        let complex = graph.to_filter_complex();
        assert!(complex.starts_with("movie='/emoji/e0.png',scale=48:48[img0];[0:v][img0]overlay="));
        assert!(complex.ends_with("[vout]"));
    }

    #[test]
    fn test_subtitles_precede_overlays() {
        let graph = FilterGraph::new().overlays([emoji(0)]).subtitles("/w/main.ass");
        let nodes = graph.nodes();
        assert!(matches!(nodes[0], FilterNode::Subtitles { .. }));
        assert!(nodes[1].is_overlay());
    }

    #[test]
    fn test_empty_window_overlay_dropped() {
        let mut overlay = emoji(0);
        overlay.end = overlay.start;
        assert_eq!(FilterGraph::new().overlays([overlay]).overlay_count(), 0);
    }

    #[test]
    fn test_prepare_inline_and_script() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FilterGraph::new().subtitles("/w/main.ass").overlays((0..3).map(emoji));

        let inline = graph.prepare(&FilterGraphConfig::default(), dir.path()).unwrap();
        assert!(!inline.is_script());

        let config = FilterGraphConfig::default().with_max_inline_overlays(2);
        let prepared = graph.prepare(&config, dir.path()).unwrap();
        match &prepared {
            PreparedFilter::Script(file) => {
                let written = std::fs::read_to_string(file.path()).unwrap();
                assert_eq!(written, graph.to_filter_complex());
            }
            PreparedFilter::Inline(_) => panic!("expected script file"),
        }

        let args = prepared.apply(FfmpegCommand::new("in.mp4", "out.mp4")).build_args();
        let at = args.iter().position(|a| a == "-filter_complex_script").unwrap();
        assert!(args[at + 1].ends_with(".txt"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[vout]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
    }

    #[test]
    fn test_long_graph_uses_script() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FilterGraph::new().subtitles("/w/main.ass");
        let config = FilterGraphConfig::default().with_max_inline_len(10);
        assert!(graph.prepare(&config, dir.path()).unwrap().is_script());
    }

    #[test]
    fn test_script_write_failure_is_surfaced() {
        let graph = FilterGraph::new().subtitles("/w/main.ass");
        let config = FilterGraphConfig::default().with_max_inline_len(0);
        let result = graph.prepare(&config, Path::new("/nonexistent/dir/for/scripts"));
        assert!(matches!(result, Err(MediaError::FilterScriptWrite { .. })));
    }
}
