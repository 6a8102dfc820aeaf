//! Time-gated image overlays composited by the encoder.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One image placed on the video for a time window.
///
/// `x_expr` is an encoder expression in `t` (seconds) so that scrolling
/// emoji can follow their comment; static overlays use a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayDescriptor {
    pub image_path: PathBuf,
    /// Start of the visible window in seconds
    pub start: f64,
    /// End of the visible window in seconds (exclusive)
    pub end: f64,
    /// Horizontal position expression
    pub x_expr: String,
    /// Top edge in video pixels
    pub y: i64,
    /// Square size in video pixels
    pub size: u32,
}

impl OverlayDescriptor {
    /// Overlay with a fixed horizontal position.
    pub fn fixed(image_path: impl Into<PathBuf>, start: f64, end: f64, x: i64, y: i64, size: u32) -> Self {
        Self {
            image_path: image_path.into(),
            start,
            end,
            x_expr: x.to_string(),
            y,
            size,
        }
    }

    /// Whether the overlay window has any duration.
    pub fn is_visible(&self) -> bool {
        self.end > self.start && self.size > 0
    }
}
