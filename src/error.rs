//! Error taxonomy for the ingestion and query paths.
//!
//! "Not found" is deliberately absent: point lookups return `Ok(None)` and
//! the query façade reports a miss as [`ToolOutput::NotFound`](crate::tools::ToolOutput).

use thiserror::Error;

/// Errors raised by the store, the event translator, and the webhook gate.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A record, payload, or tool argument is missing a required field or
    /// carries a value of the wrong shape.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The webhook signature is missing or does not match the body.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The underlying database cannot be opened, read, or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl MemoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl From<sqlx::Error> for MemoryError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
