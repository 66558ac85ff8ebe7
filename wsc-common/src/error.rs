//! Common error types for Writer Suite

use thiserror::Error;

/// Common result type for Writer Suite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the mailbox service and the copilot client
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Callback kind name not recognized
    #[error("Unknown callback kind: {0}")]
    UnknownKind(String),

    /// Envelope payload could not be rebuilt
    #[error("Malformed envelope: {0}")]
    Envelope(String),
}
