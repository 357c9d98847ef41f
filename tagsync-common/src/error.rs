//! Common error types for tagsync

use thiserror::Error;

/// Common result type for tagsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tagsync tools
///
/// "Already exists" and "does not exist" are first-class variants so callers
/// can branch on them instead of matching error-message substrings.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to reach the database or the tagging server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (duplicate create)
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Remote API returned a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for benign "duplicate create" failures that idempotent passes
    /// treat as success.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// True for benign "row/entity absent" conditions used as skip signals.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for failures worth retrying on an idempotent request:
    /// connectivity loss and server-side (5xx) errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection(_) => true,
            Error::Api(status, _) => (500..=599).contains(status),
            _ => false,
        }
    }
}
