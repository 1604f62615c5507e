//! Error types for Nimbus.

use thiserror::Error;

/// Common error type for Nimbus.
#[derive(Error, Debug)]
pub enum NimbusError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error, usually from the blob store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error (bad credentials, missing or expired token).
    #[error("authentication error: {0}")]
    Auth(String),

    /// Authenticated, but not allowed to perform the operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found, or hidden from the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate username, email, or identifier.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure (hashing, token signing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for NimbusError {
    fn from(e: sqlx::Error) -> Self {
        NimbusError::Database(e.to_string())
    }
}

/// Result type alias for Nimbus operations.
pub type Result<T> = std::result::Result<T, NimbusError>;
