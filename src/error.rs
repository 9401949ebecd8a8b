//! Error types for Huddle.

use thiserror::Error;

/// Common error type for Huddle.
#[derive(Error, Debug)]
pub enum HuddleError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for HuddleError {
    fn from(e: sqlx::Error) -> Self {
        HuddleError::Database(e.to_string())
    }
}

/// Result type alias for Huddle operations.
pub type Result<T> = std::result::Result<T, HuddleError>;
