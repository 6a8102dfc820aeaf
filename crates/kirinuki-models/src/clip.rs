//! Clip candidates, quality scores and output aspect ratios.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest and highest star rating a clip score may carry.
pub const MIN_CLIP_SCORE: u8 = 1;
pub const MAX_CLIP_SCORE: u8 = 5;

/// A proposed clip range inside a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipCandidate {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    #[serde(default)]
    pub title: String,
    /// Why this range was proposed
    #[serde(default)]
    pub reason: String,
    /// Comments posted inside the range, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<usize>,
}

impl ClipCandidate {
    pub fn new(start: f64, end: f64, title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            start,
            end,
            title: title.into(),
            reason: reason.into(),
            comment_count: None,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` lies inside the closed range `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// A validated 1-5 star clip rating with its reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipScore {
    score: u8,
    pub reason: String,
}

impl ClipScore {
    /// Clamp a raw rating into the 1-5 range.
    pub fn new(score: i64, reason: impl Into<String>) -> Self {
        let clamped = score.clamp(MIN_CLIP_SCORE as i64, MAX_CLIP_SCORE as i64) as u8;
        Self {
            score: clamped,
            reason: reason.into(),
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }
}

/// Output aspect ratio (width:height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical short-form (9:16)
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Broadcast landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Whether clips with this ratio are letterboxed onto the vertical canvas.
    pub fn is_portrait(&self) -> bool {
        *self == Self::PORTRAIT
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}
