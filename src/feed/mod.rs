//! Live Feed Subscriber
//!
//! Push-channel client that keeps a reconnecting connection per channel and
//! dispatches lifecycle and domain events to registered handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   Connector    ┌───────────┐  FeedMessage  ┌────────────┐
//! │ push server  │ ─────────────▶ │  Driver   │ ────────────▶ │  Handler   │
//! │ (WebSocket)  │ ◀── subscribe  │  (task)   │   FeedEvent   │  Registry  │
//! └──────────────┘                └───────────┘               └────────────┘
//!                                       │ watch
//!                                       ▼
//!                                ConnectionState
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storedash::feed::{FeedConfig, LiveFeedSubscriber, WsConnector, NEW_TRANSACTION};
//! use storedash::records::Transaction;
//!
//! let subscriber = LiveFeedSubscriber::new(
//!     Arc::new(WsConnector::new("ws://localhost:4000/feed")),
//!     FeedConfig::default(),
//! );
//! let sub = subscriber.subscribe_typed(NEW_TRANSACTION, |tx: Transaction| {
//!     println!("{} paid {}", tx.customer, tx.amount);
//! });
//! subscriber.connect("transactions");
//!
//! // later
//! sub.unsubscribe();
//! subscriber.disconnect("transactions").await;
//! ```

mod error;
mod events;
mod recent;
mod registry;
mod state;
mod subscriber;
mod transport;

pub use error::FeedError;
pub use events::{
    ClientMessage, FeedEvent, FeedMessage, ANY, CONNECT, CONNECT_ERROR, DISCONNECT, ERROR,
    NEW_TRANSACTION,
};
pub use recent::{prepend_bounded, DEFAULT_RECENT_LIMIT};
pub use registry::{EventHandler, HandlerRegistry, Subscription};
pub use state::ConnectionState;
pub use subscriber::{FeedChannel, FeedConfig, LiveFeedSubscriber};
pub use transport::{Connector, Transport, WsConnector};
