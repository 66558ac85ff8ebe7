//! Error types for wsc-copilot

use thiserror::Error;

/// Client-side errors
///
/// Transport failures during polling are absorbed by the poller's retry
/// budget; they only surface here from single calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or body read failure
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// A copilot request is already waiting on the workflow
    #[error("A copilot request is already in flight")]
    Busy,

    /// wsc-common error
    #[error(transparent)]
    Common(#[from] wsc_common::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
