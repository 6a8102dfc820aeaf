//! Viewer comments replayed as scrolling overlays.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Density that keeps every comment.
pub const FULL_DENSITY: u8 = 100;

/// A single timestamped viewer comment.
///
/// Text may contain inline emoji shortcuts such as `:_kusa:` which are
/// resolved against a per-channel emoji map at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommentEvent {
    pub text: String,
    /// Seconds from the start of the source video
    pub timestamp: f64,
}

impl CommentEvent {
    pub fn new(text: impl Into<String>, timestamp: f64) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Deterministic density gate: keeps the comment when
    /// `int(timestamp * 1000) mod 100 < density`.
    pub fn passes_density(&self, density: u8) -> bool {
        if density >= FULL_DENSITY {
            return true;
        }
        let millis = (self.timestamp * 1000.0) as i64;
        millis.rem_euclid(100) < density as i64
    }
}

/// Keep comments that pass the density gate (percent, 0-100).
pub fn filter_by_density(comments: &[CommentEvent], density: u8) -> Vec<CommentEvent> {
    comments
        .iter()
        .filter(|c| c.passes_density(density))
        .cloned()
        .collect()
}

/// Comments inside `[start, end]`, density-filtered and re-based so that
/// `start` becomes time zero.
pub fn comments_for_clip(
    comments: &[CommentEvent],
    start: f64,
    end: f64,
    density: u8,
) -> Vec<CommentEvent> {
    comments
        .iter()
        .filter(|c| c.timestamp >= start && c.timestamp <= end)
        .filter(|c| c.passes_density(density))
        .map(|c| CommentEvent::new(c.text.clone(), c.timestamp - start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_gate() {
        // 1.005s -> 1005ms -> 5
        let comment = CommentEvent::new("w", 1.005);
        assert!(comment.passes_density(10));
        assert!(!comment.passes_density(5));
        assert!(comment.passes_density(100));
        assert!(!comment.passes_density(0));
    }

    #[test]
    fn test_filter_by_density_is_deterministic() {
        let comments: Vec<_> = (0..200)
            .map(|i| CommentEvent::new(format!("c{i}"), i as f64 * 0.013))
            .collect();
        let first = filter_by_density(&comments, 30);
        let second = filter_by_density(&comments, 30);
        assert_eq!(first, second);
        assert!(first.len() < comments.len());
        assert_eq!(filter_by_density(&comments, 100).len(), comments.len());
    }

    #[test]
    fn test_comments_for_clip_rebases() {
        let comments = vec![
            CommentEvent::new("before", 4.0),
            CommentEvent::new("inside", 12.5),
            CommentEvent::new("edge", 20.0),
            CommentEvent::new("after", 21.0),
        ];
        let clip = comments_for_clip(&comments, 10.0, 20.0, 100);
        assert_eq!(clip.len(), 2);
        assert_eq!(clip[0].text, "inside");
        assert!((clip[0].timestamp - 2.5).abs() < 1e-9);
        assert!((clip[1].timestamp - 10.0).abs() < 1e-9);
    }
}
