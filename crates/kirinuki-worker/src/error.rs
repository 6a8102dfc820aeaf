//! Worker error types.

use kirinuki_media::MediaError;
use kirinuki_models::ModelError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Style error: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn transcription_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Encoder failures are never retried: the same graph fails the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Io(_) | WorkerError::Media(MediaError::Timeout(_)) | WorkerError::Media(MediaError::Io(_))
        )
    }
}
