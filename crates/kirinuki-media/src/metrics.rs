//! Encoder metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the binary that embeds this crate.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const ENCODER_RUNS_TOTAL: &str = "kirinuki_encoder_runs_total";
    pub const ENCODER_FAILURES_TOTAL: &str = "kirinuki_encoder_failures_total";
    pub const ENCODER_DURATION_SECONDS: &str = "kirinuki_encoder_duration_seconds";
    pub const OVERLAYS_SKIPPED_TOTAL: &str = "kirinuki_overlays_skipped_total";
}

/// Record a started encoder run.
pub fn record_encoder_run(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::ENCODER_RUNS_TOTAL, &labels).increment(1);
}

/// Record a failed encoder run.
pub fn record_encoder_failure(operation: &str, reason: &str) {
    let labels = [
        ("operation", operation.to_string()),
        ("reason", reason.to_string()),
    ];
    counter!(names::ENCODER_FAILURES_TOTAL, &labels).increment(1);
}

/// Record how long an encoder run took.
pub fn record_encoder_duration(operation: &str, duration_secs: f64) {
    let labels = [("operation", operation.to_string())];
    histogram!(names::ENCODER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an overlay dropped because its image was missing.
pub fn record_overlay_skipped() {
    counter!(names::OVERLAYS_SKIPPED_TOTAL).increment(1);
}
