//! Shared error type across foundation modules.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, FoundationError>;

/// Unified error type used by every foundation module.
#[derive(Debug, Error)]
pub enum FoundationError {
    /// Caller supplied an invalid argument.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{format} error: {message}")]
    Serialization {
        format: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A process-global component was set up twice.
    #[error("already initialized: {0}")]
    AlreadyInitialized(&'static str),

    #[error("telemetry error: {0}")]
    Telemetry(String),
}

impl FoundationError {
    pub(crate) fn serialization(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            format,
            message: err.to_string(),
        }
    }
}
