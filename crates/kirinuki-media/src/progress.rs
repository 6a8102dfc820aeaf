//! FFmpeg progress reports.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Encoded output time in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_ms as f64 / 1000.0
    }

    /// Percentage of `total_secs` encoded so far, capped at 100.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs() / total_secs * 100.0).clamp(0.0, 100.0)
    }

    /// Estimated seconds remaining at the current speed.
    pub fn eta_seconds(&self, total_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining = (total_secs - self.out_time_secs()).max(0.0);
        Some(remaining / self.speed)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;
