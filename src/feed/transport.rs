//! Feed transports
//!
//! The subscriber only sees the `Connector` / `Transport` traits. `WsConnector`
//! is the production implementation: a WebSocket carrying JSON frames of the
//! form `{"event": "newTransaction", "data": {...}}`.

use super::error::FeedError;
use super::events::{ClientMessage, FeedMessage};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// An open connection to the push server
#[async_trait]
pub trait Transport: Send {
    /// Next frame; `None` once the peer has closed the connection
    async fn next_message(&mut self) -> Option<Result<FeedMessage, FeedError>>;

    /// Close the connection
    async fn close(&mut self);
}

/// Opens transports for a channel
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, channel: &str) -> Result<Box<dyn Transport>, FeedError>;
}

/// WebSocket connector
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, channel: &str) -> Result<Box<dyn Transport>, FeedError> {
        let (mut stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| FeedError::Timeout)?
                .map_err(|e| FeedError::Connect(e.to_string()))?;

        let subscribe = serde_json::to_string(&ClientMessage::Subscribe {
            channel: channel.to_string(),
        })?;
        stream
            .send(Message::Text(subscribe))
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        tracing::debug!(url = %self.url, channel = %channel, "WebSocket opened");

        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_message(&mut self) -> Option<Result<FeedMessage, FeedError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(FeedError::Transport(e.to_string()))),
            };

            match frame {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).map_err(FeedError::from))
                }
                Message::Binary(bytes) => {
                    return Some(serde_json::from_slice(&bytes).map_err(FeedError::from))
                }
                Message::Ping(payload) => {
                    if let Err(e) = self.stream.send(Message::Pong(payload)).await {
                        return Some(Err(FeedError::Transport(e.to_string())));
                    }
                }
                Message::Close(_) => return None,
                Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        let close = self.stream.close(None);
        if tokio::time::timeout(Duration::from_secs(1), close).await.is_err() {
            tracing::debug!("WebSocket close handshake timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_builder() {
        let connector = WsConnector::new("ws://localhost:4000/feed")
            .connect_timeout(Duration::from_millis(250));
        assert_eq!(connector.url(), "ws://localhost:4000/feed");
        assert_eq!(connector.connect_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 9 (discard) is closed on test machines
        let connector =
            WsConnector::new("ws://127.0.0.1:9/feed").connect_timeout(Duration::from_secs(2));
        let result = connector.connect("transactions").await;
        assert!(matches!(
            result,
            Err(FeedError::Connect(_)) | Err(FeedError::Timeout)
        ));
    }
}
