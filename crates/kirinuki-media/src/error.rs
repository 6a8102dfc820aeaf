//! Error types for media operations.

use std::path::PathBuf;

use kirinuki_models::ModelError;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during compositing and encoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Encoder failed: {message}")]
    EncoderFailure {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Overlay asset missing: {0}")]
    MissingOverlayAsset(PathBuf),

    #[error("Failed to write filter script {path}: {source}")]
    FilterScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an encoder failure error.
    pub fn encoder_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncoderFailure {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a filter script write error.
    pub fn filter_script_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FilterScriptWrite {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured encoder stderr, when this is an encoder failure.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::EncoderFailure { stderr, .. } | Self::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}
