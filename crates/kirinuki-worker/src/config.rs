//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use kirinuki_media::filter_graph::DEFAULT_FONTS_DIR;
use kirinuki_media::{FfmpegRunner, FilterGraphConfig};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding source videos, chat replays and job outputs
    pub work_dir: PathBuf,
    /// Root of the per-channel emoji directories
    pub emoji_dir: PathBuf,
    /// Fonts handed to the subtitle renderer
    pub fonts_dir: PathBuf,
    /// Kill the encoder after this long
    pub encoder_timeout: Duration,
    /// Longest filter graph passed on the command line
    pub max_inline_filter_len: usize,
    /// Percentage of comments kept when a job does not set one
    pub danmaku_density: u8,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/kirinuki"),
            emoji_dir: PathBuf::from("/tmp/kirinuki/emojis"),
            fonts_dir: PathBuf::from(DEFAULT_FONTS_DIR),
            encoder_timeout: Duration::from_secs(3600), // 1 hour
            max_inline_filter_len: FilterGraphConfig::default().max_inline_len,
            danmaku_density: 10,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let work_dir = std::env::var("KIRINUKI_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        Self {
            emoji_dir: std::env::var("KIRINUKI_EMOJI_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("emojis")),
            fonts_dir: std::env::var("KIRINUKI_FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fonts_dir),
            encoder_timeout: Duration::from_secs(
                std::env::var("KIRINUKI_ENCODER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            max_inline_filter_len: std::env::var("KIRINUKI_MAX_INLINE_FILTER_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_inline_filter_len),
            danmaku_density: std::env::var("KIRINUKI_DANMAKU_DENSITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|d: u8| d.min(100))
                .unwrap_or(defaults.danmaku_density),
            work_dir,
        }
    }

    /// Where uploaded prefix images live.
    pub fn prefix_images_dir(&self) -> PathBuf {
        self.work_dir.join("prefix_images")
    }

    pub fn filter_graph_config(&self) -> FilterGraphConfig {
        FilterGraphConfig::default().with_max_inline_len(self.max_inline_filter_len)
    }

    /// Encoder runner with this config's timeout.
    pub fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.encoder_timeout.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.danmaku_density, 10);
        assert_eq!(config.prefix_images_dir(), PathBuf::from("/tmp/kirinuki/prefix_images"));
        assert_eq!(config.filter_graph_config().max_inline_len, config.max_inline_filter_len);
    }
}
