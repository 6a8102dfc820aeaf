//! Timestamped subtitle cues.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Markup soft line break.
pub const MARKUP_LINE_BREAK: &str = "\\N";

/// One timestamped subtitle text unit.
///
/// This is the single record type used for transcription segments,
/// parsed subtitle tracks and clip-boundary input alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cue {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Text, possibly spanning several lines
    pub text: String,
}

impl Cue {
    /// Create a new cue.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Duration in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether the cue is showing at time `t` (half-open `[start, end)`).
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Individual text lines, splitting on both `\n` and the markup soft break.
    pub fn lines(&self) -> Vec<&str> {
        split_lines(&self.text)
    }
}

/// Split text on newlines and markup soft breaks.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .flat_map(|line| line.split(MARKUP_LINE_BREAK))
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

/// Sort cues by start time, keeping the original order for ties.
pub fn sort_cues(cues: &mut [Cue]) {
    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
}
