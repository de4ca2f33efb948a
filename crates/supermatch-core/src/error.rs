//! Error types for Supermatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Caller error: missing criteria, bad limit, malformed profile. Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream embedding provider failed (unreachable, timeout, bad response).
    #[error("Embedding provider error: {0}")]
    Embedding(String),

    /// Provider and schema disagree on vector length. Fatal.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Configuration-level failures that must stop the process or batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::DimensionMismatch { .. })
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
