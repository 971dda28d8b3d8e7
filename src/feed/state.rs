//! Connection state machine
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (Disconnected | Reconnecting)
//! Reconnecting -> Connected | GaveUp
//! ```

use serde::Serialize;

/// State of one channel's transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and no attempt in progress
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    Connected,
    /// Lost the connection; retries are scheduled
    Reconnecting,
    /// Retries exhausted; only an explicit connect starts over
    GaveUp,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// A driver task owns the channel in these states
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::GaveUp => "gave_up",
        };
        write!(f, "{}", label)
    }
}
