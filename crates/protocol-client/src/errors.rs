//! Error types for the protocol-client crate

use std::time::Duration;
use thiserror::Error;

use crate::message::ResponseError;

/// Result type alias for protocol client operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO on the underlying transport failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be serialized or deserialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The duplex channel to the server is gone
    #[error("Protocol channel closed")]
    ChannelClosed,

    /// No response arrived in time
    #[error("Request {id} ({method}) timed out after {timeout:?}")]
    Timeout {
        id: u64,
        method: String,
        timeout: Duration,
    },

    /// The server answered with an error object
    #[error("Server error {}: {}", .0.code, .0.message)]
    Server(ResponseError),
}
