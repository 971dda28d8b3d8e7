//! Live Feed Event Types
//!
//! Lifecycle and domain events delivered to subscribers, plus the JSON frames
//! exchanged with the push server.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Transport connected
pub const CONNECT: &str = "connect";
/// Transport closed (by the peer, an error, or the client)
pub const DISCONNECT: &str = "disconnect";
/// A connection attempt failed
pub const CONNECT_ERROR: &str = "connect_error";
/// Transport or protocol error, including giving up on reconnection
pub const ERROR: &str = "error";
/// Domain event carrying one new transaction
pub const NEW_TRANSACTION: &str = "newTransaction";
/// Subscribing to this name receives every event
pub const ANY: &str = "*";

/// Event delivered to subscriber handlers
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connect {
        channel: String,
        /// Identifier of the connection attempt that succeeded
        connection_id: String,
    },
    Disconnect {
        channel: String,
        reason: String,
    },
    ConnectError {
        channel: String,
        message: String,
    },
    Error {
        channel: String,
        message: String,
    },
    /// Domain event pushed by the server
    Message {
        channel: String,
        event: String,
        payload: serde_json::Value,
    },
}

impl FeedEvent {
    /// Event name handlers subscribe to
    pub fn name(&self) -> &str {
        match self {
            FeedEvent::Connect { .. } => CONNECT,
            FeedEvent::Disconnect { .. } => DISCONNECT,
            FeedEvent::ConnectError { .. } => CONNECT_ERROR,
            FeedEvent::Error { .. } => ERROR,
            FeedEvent::Message { event, .. } => event,
        }
    }

    /// Channel the event came from
    pub fn channel(&self) -> &str {
        match self {
            FeedEvent::Connect { channel, .. }
            | FeedEvent::Disconnect { channel, .. }
            | FeedEvent::ConnectError { channel, .. }
            | FeedEvent::Error { channel, .. }
            | FeedEvent::Message { channel, .. } => channel,
        }
    }

    /// Decode the payload of a domain event
    ///
    /// Returns `None` for lifecycle events.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        match self {
            FeedEvent::Message { payload, .. } => Some(T::deserialize(payload)),
            _ => None,
        }
    }
}

/// A frame received from the push server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// Domain event name (e.g. `newTransaction`)
    pub event: String,
    /// Event payload, usually one record
    #[serde(default)]
    pub data: serde_json::Value,
}

impl FeedMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Frames sent to the push server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a channel after the socket opens
    Subscribe { channel: String },
    /// Leave a channel
    Unsubscribe { channel: String },
    /// Keepalive
    Ping,
}
