//! Live feed error types

use thiserror::Error;

/// Errors raised by feed transports
///
/// These never reach UI code as errors; the subscriber turns them into
/// `connect_error` / `error` events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Could not open the transport
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Opening the transport took too long
    #[error("Connection timed out")]
    Timeout,

    /// Established transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A frame could not be decoded; the connection stays up
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FeedError {
    /// Whether the transport survives this error
    pub fn is_decode(&self) -> bool {
        matches!(self, FeedError::Decode(_))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}
