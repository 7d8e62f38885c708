//! Transport-level errors seen by RPC callers.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while calling the recorder server.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a JSON-RPC fault.
    #[error("RPC error ({code}): {message}")]
    Fault { code: i64, message: String },

    /// The server answered with a non-success HTTP status.
    #[error("Protocol error ({code}): {message}")]
    Protocol { code: u16, message: String },

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No response arrived within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered, but not with something we understand.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
