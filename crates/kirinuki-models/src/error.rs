//! Error types for model-level codecs.

use thiserror::Error;

/// Result type for model codec operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while decoding timestamps and colors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Malformed timestamp: '{0}'")]
    MalformedTimestamp(String),

    #[error("Invalid color '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),
}

impl ModelError {
    /// Create a malformed timestamp error.
    pub fn malformed_timestamp(value: impl Into<String>) -> Self {
        Self::MalformedTimestamp(value.into())
    }

    /// Create an invalid color error.
    pub fn invalid_color(value: impl Into<String>) -> Self {
        Self::InvalidColor(value.into())
    }
}
