use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A crop region in source-video pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    /// X coordinate of the top-left corner
    #[serde(default)]
    pub x: u32,
    /// Y coordinate of the top-left corner
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl CropRect {
    /// Create a new crop rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// A crop with no area is treated as "no crop".
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// FFmpeg `crop` filter for this rectangle.
    pub fn to_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}
