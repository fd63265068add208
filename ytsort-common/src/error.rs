//! Common error types for ytsort

use thiserror::Error;

/// Common result type for ytsort operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ytsort crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding of a persisted record failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (malformed timestamp, duration, identifier)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
