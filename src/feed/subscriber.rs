//! Live Feed Subscriber
//!
//! Owns one driver task per channel. The driver opens the transport, relays
//! frames to registered handlers, and reconnects with a fixed delay until the
//! retry budget is spent.
//!
//! # State machine
//!
//! ```text
//! connect()      Disconnected | GaveUp -> Connecting
//! open           Connecting | Reconnecting -> Connected      (retries reset)
//! lost / failed  Connecting | Connected | Reconnecting -> Reconnecting
//! budget spent   Reconnecting -> GaveUp                      (`error` event)
//! disconnect()   any -> Disconnected                         (retries reset)
//! ```
//!
//! Every connect starts a new generation; a driver whose generation is stale
//! exits without touching state, so a late event from a torn-down transport
//! never resurrects a disconnected channel.

use super::events::{FeedEvent, CONNECT, CONNECT_ERROR, DISCONNECT, ERROR};
use super::recent::DEFAULT_RECENT_LIMIT;
use super::registry::{HandlerRegistry, Subscription};
use super::state::ConnectionState;
use super::transport::{Connector, Transport};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Reconnection policy and ticker size
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Reconnect attempts after a lost or failed connection
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Length of the recent-items list fed by this subscriber
    pub recent_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(5),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl FeedConfig {
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

#[derive(Debug, Default)]
struct ChannelInner {
    state: ConnectionState,
    retries: u32,
    generation: u64,
}

enum RetryDecision {
    Retry(u32),
    GiveUp,
    Stale,
}

/// State shared between the subscriber and a channel's driver
struct ChannelShared {
    name: String,
    inner: Mutex<ChannelInner>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ChannelShared {
    fn new(name: &str) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            name: name.to_string(),
            inner: Mutex::new(ChannelInner::default()),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, inner: &mut ChannelInner, state: ConnectionState) {
        if inner.state != state {
            tracing::debug!(channel = %self.name, from = %inner.state, to = %state, "Feed state changed");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    fn state(&self) -> ConnectionState {
        self.lock().state
    }

    fn retries(&self) -> u32 {
        self.lock().retries
    }

    /// Start a new generation in `Connecting`
    fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.retries = 0;
        self.set_state(&mut inner, ConnectionState::Connecting);
        inner.generation
    }

    /// Invalidate the current driver; returns the previous state
    fn reset(&self) -> ConnectionState {
        let mut inner = self.lock();
        let previous = inner.state;
        inner.generation += 1;
        inner.retries = 0;
        self.set_state(&mut inner, ConnectionState::Disconnected);
        previous
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    fn on_connected(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.retries = 0;
        self.set_state(&mut inner, ConnectionState::Connected);
        true
    }

    fn on_failure(&self, generation: u64, max_retries: u32) -> RetryDecision {
        let mut inner = self.lock();
        if inner.generation != generation {
            return RetryDecision::Stale;
        }
        if inner.retries < max_retries {
            inner.retries += 1;
            self.set_state(&mut inner, ConnectionState::Reconnecting);
            RetryDecision::Retry(inner.retries)
        } else {
            self.set_state(&mut inner, ConnectionState::GaveUp);
            RetryDecision::GiveUp
        }
    }
}

struct ChannelEntry {
    shared: Arc<ChannelShared>,
    stop: Option<Arc<Notify>>,
    task: Option<JoinHandle<()>>,
}

/// Handle returned by `connect`
///
/// Cheap to clone; observes the channel's state without owning it.
#[derive(Debug, Clone)]
pub struct FeedChannel {
    name: String,
    state_rx: watch::Receiver<ConnectionState>,
}

impl FeedChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Wait until the channel reaches `target`
    ///
    /// Returns false if the subscriber was dropped first.
    pub async fn wait_for(&mut self, target: ConnectionState) -> bool {
        self.state_rx.wait_for(|state| *state == target).await.is_ok()
    }
}

/// Connection manager and event dispatcher for live feeds
///
/// `connect` must be called from within a Tokio runtime.
pub struct LiveFeedSubscriber {
    connector: Arc<dyn Connector>,
    config: FeedConfig,
    handlers: HandlerRegistry,
    channels: Mutex<HashMap<String, ChannelEntry>>,
}

impl LiveFeedSubscriber {
    pub fn new(connector: Arc<dyn Connector>, config: FeedConfig) -> Self {
        Self {
            connector,
            config,
            handlers: HandlerRegistry::new(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, ChannelEntry>> {
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open (or reuse) the connection for `channel`
    ///
    /// Idempotent while the channel is connecting, connected or reconnecting.
    /// From `Disconnected` or `GaveUp` it starts over with a fresh retry budget.
    pub fn connect(&self, channel: &str) -> FeedChannel {
        let mut channels = self.channels();
        let entry = channels
            .entry(channel.to_string())
            .or_insert_with(|| ChannelEntry {
                shared: Arc::new(ChannelShared::new(channel)),
                stop: None,
                task: None,
            });

        let handle = FeedChannel {
            name: channel.to_string(),
            state_rx: entry.shared.state_tx.subscribe(),
        };

        let state = entry.shared.state();
        if state.is_active() {
            tracing::debug!(channel = %channel, state = %state, "Reusing feed connection");
            return handle;
        }

        let generation = entry.shared.begin();
        let stop = Arc::new(Notify::new());
        let driver = Driver {
            shared: Arc::clone(&entry.shared),
            generation,
            connector: Arc::clone(&self.connector),
            handlers: self.handlers.clone(),
            config: self.config.clone(),
            stop: Arc::clone(&stop),
        };

        tracing::info!(channel = %channel, "Connecting live feed");

        entry.stop = Some(stop);
        entry.task = Some(tokio::spawn(driver.run()));
        handle
    }

    /// Tear down the connection for `channel`
    ///
    /// Leaves the channel `Disconnected` with its retry counter reset. A
    /// `disconnect` event is emitted if the channel was connected.
    pub async fn disconnect(&self, channel: &str) {
        let (previous, stop, task) = {
            let mut channels = self.channels();
            let Some(entry) = channels.get_mut(channel) else {
                return;
            };
            (entry.shared.reset(), entry.stop.take(), entry.task.take())
        };

        if let Some(stop) = stop {
            stop.notify_one();
        }
        if let Some(task) = task {
            let abort = task.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                tracing::warn!(channel = %channel, "Feed driver did not stop in time, aborting");
                abort.abort();
            }
        }

        tracing::info!(channel = %channel, "Live feed disconnected");

        if previous.is_connected() {
            self.handlers.emit(&FeedEvent::Disconnect {
                channel: channel.to_string(),
                reason: "client disconnect".to_string(),
            });
        }
    }

    /// Disconnect every channel and drop all handlers
    pub async fn shutdown(&self) {
        let names: Vec<String> = self.channels().keys().cloned().collect();
        for name in names {
            self.disconnect(&name).await;
        }
        self.handlers.clear();
    }

    /// Register a handler for a lifecycle or domain event
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.handlers.register(event, Arc::new(handler))
    }

    /// Register a handler receiving the decoded payload of a domain event
    ///
    /// Payloads that fail to decode are logged and skipped.
    pub fn subscribe_typed<T, F>(&self, event: &str, handler: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(event, move |feed_event| match feed_event.decode::<T>() {
            Some(Ok(payload)) => handler(payload),
            Some(Err(e)) => {
                tracing::warn!(event = %feed_event.name(), error = %e, "Dropping undecodable feed payload")
            }
            None => {}
        })
    }

    pub fn on_connect<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe(CONNECT, handler)
    }

    pub fn on_disconnect<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe(DISCONNECT, handler)
    }

    pub fn on_connect_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe(CONNECT_ERROR, handler)
    }

    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe(ERROR, handler)
    }

    /// Current state; unknown channels are `Disconnected`
    pub fn state(&self, channel: &str) -> ConnectionState {
        self.channels()
            .get(channel)
            .map(|entry| entry.shared.state())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, channel: &str) -> bool {
        self.state(channel).is_connected()
    }

    /// Reconnect attempts since the last successful open
    pub fn retry_count(&self, channel: &str) -> u32 {
        self.channels()
            .get(channel)
            .map(|entry| entry.shared.retries())
            .unwrap_or(0)
    }

    /// State updates for a channel, or `None` if it was never connected
    pub fn watch_state(&self, channel: &str) -> Option<watch::Receiver<ConnectionState>> {
        self.channels()
            .get(channel)
            .map(|entry| entry.shared.state_tx.subscribe())
    }
}

/// Per-channel connection loop
struct Driver {
    shared: Arc<ChannelShared>,
    generation: u64,
    connector: Arc<dyn Connector>,
    handlers: HandlerRegistry,
    config: FeedConfig,
    stop: Arc<Notify>,
}

impl Driver {
    fn channel(&self) -> String {
        self.shared.name.clone()
    }

    /// Emit only while this driver still owns the channel
    fn emit(&self, event: FeedEvent) {
        if self.shared.is_current(self.generation) {
            self.handlers.emit(&event);
        }
    }

    async fn run(self) {
        loop {
            let attempt_id = Uuid::new_v4();
            tracing::debug!(channel = %self.shared.name, attempt_id = %attempt_id, "Opening feed transport");

            let opened = tokio::select! {
                _ = self.stop.notified() => return,
                result = self.connector.connect(&self.shared.name) => result,
            };

            match opened {
                Ok(mut transport) => {
                    if !self.shared.on_connected(self.generation) {
                        transport.close().await;
                        return;
                    }
                    tracing::info!(channel = %self.shared.name, connection_id = %attempt_id, "Live feed connected");
                    self.emit(FeedEvent::Connect {
                        channel: self.channel(),
                        connection_id: attempt_id.to_string(),
                    });

                    let Some(reason) = self.pump(&mut transport).await else {
                        transport.close().await;
                        return;
                    };
                    transport.close().await;

                    tracing::warn!(channel = %self.shared.name, reason = %reason, "Live feed lost");
                    self.emit(FeedEvent::Disconnect {
                        channel: self.channel(),
                        reason,
                    });
                }
                Err(e) => {
                    tracing::warn!(channel = %self.shared.name, attempt_id = %attempt_id, error = %e, "Live feed connection failed");
                    self.emit(FeedEvent::ConnectError {
                        channel: self.channel(),
                        message: e.to_string(),
                    });
                }
            }

            match self.shared.on_failure(self.generation, self.config.max_retries) {
                RetryDecision::Retry(attempt) => {
                    tracing::info!(
                        channel = %self.shared.name,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        "Scheduling feed reconnect"
                    );
                    tokio::select! {
                        _ = self.stop.notified() => return,
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::error!(channel = %self.shared.name, max_retries = self.config.max_retries, "Giving up on live feed");
                    self.emit(FeedEvent::Error {
                        channel: self.channel(),
                        message: format!(
                            "gave up after {} reconnect attempts",
                            self.config.max_retries
                        ),
                    });
                    return;
                }
                RetryDecision::Stale => return,
            }
        }
    }

    /// Relay frames until the transport drops
    ///
    /// Returns the disconnect reason, or `None` when asked to stop.
    async fn pump(&self, transport: &mut Box<dyn Transport>) -> Option<String> {
        loop {
            let next = tokio::select! {
                _ = self.stop.notified() => return None,
                next = transport.next_message() => next,
            };

            match next {
                Some(Ok(message)) => {
                    tracing::trace!(channel = %self.shared.name, event = %message.event, "Feed message");
                    self.emit(FeedEvent::Message {
                        channel: self.channel(),
                        event: message.event,
                        payload: message.data,
                    });
                }
                Some(Err(e)) if e.is_decode() => {
                    tracing::warn!(channel = %self.shared.name, error = %e, "Skipping malformed feed frame");
                    self.emit(FeedEvent::Error {
                        channel: self.channel(),
                        message: e.to_string(),
                    });
                }
                Some(Err(e)) => {
                    self.emit(FeedEvent::Error {
                        channel: self.channel(),
                        message: e.to_string(),
                    });
                    return Some(e.to_string());
                }
                None => return Some("closed by server".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::error::FeedError;
    use crate::feed::events::{FeedMessage, NEW_TRANSACTION};
    use crate::feed::recent::prepend_bounded;
    use crate::records::Transaction;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    type Frame = Result<FeedMessage, FeedError>;

    struct MockTransport {
        rx: mpsc::UnboundedReceiver<Frame>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn next_message(&mut self) -> Option<Frame> {
            self.rx.recv().await
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Hands out scripted transports; refuses once the script runs out
    #[derive(Default)]
    struct MockConnector {
        script: Mutex<VecDeque<mpsc::UnboundedReceiver<Frame>>>,
        attempts: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl MockConnector {
        fn refusing() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_session(self: &Arc<Self>) -> mpsc::UnboundedSender<Frame> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.script.lock().unwrap().push_back(rx);
            tx
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, _channel: &str) -> Result<Box<dyn Transport>, FeedError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(rx) => Ok(Box::new(MockTransport {
                    rx,
                    closed: Arc::clone(&self.closed),
                })),
                None => Err(FeedError::Connect("connection refused".to_string())),
            }
        }
    }

    /// Never finishes opening, holding the channel in `Connecting`
    #[derive(Default)]
    struct StalledConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connector for StalledConnector {
        async fn connect(&self, _channel: &str) -> Result<Box<dyn Transport>, FeedError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn generation(subscriber: &LiveFeedSubscriber, channel: &str) -> u64 {
        subscriber.channels().get(channel).unwrap().shared.lock().generation
    }

    fn fast_config() -> FeedConfig {
        FeedConfig::default().retry_delay(Duration::from_millis(5))
    }

    async fn reach(channel: &mut FeedChannel, state: ConnectionState) {
        tokio::time::timeout(Duration::from_secs(5), channel.wait_for(state))
            .await
            .expect("state not reached in time");
    }

    fn transaction_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "customer": "Ann Lee",
            "amount": 42.0,
            "status": "completed",
            "method": "card",
            "date": "2024-03-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let connector = MockConnector::refusing();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let errors = Arc::new(Mutex::new(Vec::new()));
        {
            let errors = Arc::clone(&errors);
            subscriber.on_error(move |event| {
                if let FeedEvent::Error { message, .. } = event {
                    errors.lock().unwrap().push(message.clone());
                }
            });
        }
        let connect_errors = Arc::new(AtomicUsize::new(0));
        {
            let connect_errors = Arc::clone(&connect_errors);
            subscriber.on_connect_error(move |_| {
                connect_errors.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::GaveUp).await;

        // Initial attempt plus five retries
        assert_eq!(connector.attempts(), 6);
        assert_eq!(connect_errors.load(Ordering::SeqCst), 6);
        assert_eq!(subscriber.retry_count("transactions"), 5);

        // The give-up error follows the state change
        tokio::time::timeout(Duration::from_secs(5), async {
            while errors.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(errors.lock().unwrap()[0].contains("gave up"));

        // No further attempts on its own
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.attempts(), 6);
        assert_eq!(subscriber.state("transactions"), ConnectionState::GaveUp);
    }

    #[tokio::test]
    async fn test_connect_after_give_up_starts_over() {
        let connector = MockConnector::refusing();
        let subscriber =
            LiveFeedSubscriber::new(connector.clone(), fast_config().max_retries(1));

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::GaveUp).await;
        assert_eq!(connector.attempts(), 2);

        let _session = connector.with_session();
        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Connected).await;
        assert_eq!(connector.attempts(), 3);
        assert_eq!(subscriber.retry_count("transactions"), 0);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let connector = MockConnector::refusing();
        let _session = connector.with_session();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let mut first = subscriber.connect("transactions");
        reach(&mut first, ConnectionState::Connected).await;

        let second = subscriber.connect("transactions");
        assert!(second.is_connected());
        assert_eq!(second.name(), "transactions");
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_connect_while_reconnecting_starts_no_new_attempt() {
        let connector = MockConnector::refusing();
        let subscriber = LiveFeedSubscriber::new(
            connector.clone(),
            FeedConfig::default().retry_delay(Duration::from_secs(60)),
        );

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Reconnecting).await;
        assert_eq!(connector.attempts(), 1);
        let driver = generation(&subscriber, "transactions");

        let again = subscriber.connect("transactions");
        assert_eq!(again.state(), ConnectionState::Reconnecting);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(connector.attempts(), 1);
        assert_eq!(generation(&subscriber, "transactions"), driver);
        assert_eq!(subscriber.retry_count("transactions"), 1);

        subscriber.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_while_connecting_starts_no_new_attempt() {
        let connector = Arc::new(StalledConnector::default());
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        subscriber.connect("transactions");
        tokio::time::timeout(Duration::from_secs(5), async {
            while connector.attempts.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let driver = generation(&subscriber, "transactions");

        let again = subscriber.connect("transactions");
        assert_eq!(again.state(), ConnectionState::Connecting);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(generation(&subscriber, "transactions"), driver);

        // A stalled open still yields to disconnect
        subscriber.disconnect("transactions").await;
        assert_eq!(subscriber.state("transactions"), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_typed_events_reach_handlers_in_order() {
        let connector = MockConnector::refusing();
        let session = connector.with_session();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let recent: Arc<Mutex<Vec<Transaction>>> = Arc::new(Mutex::new(Vec::new()));
        let limit = subscriber.config().recent_limit;
        {
            let recent = Arc::clone(&recent);
            subscriber.subscribe_typed(NEW_TRANSACTION, move |tx: Transaction| {
                let mut list = recent.lock().unwrap();
                let next = prepend_bounded(&list, tx, limit);
                *list = next;
            });
        }

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Connected).await;

        for i in 1..=12 {
            let id = format!("TX-{}", i);
            session
                .send(Ok(FeedMessage::new(NEW_TRANSACTION, transaction_json(&id))))
                .unwrap();
        }
        // Undecodable payload is skipped without dropping the connection
        session
            .send(Ok(FeedMessage::new(NEW_TRANSACTION, serde_json::json!({"id": 1}))))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while recent.lock().unwrap().first().map(|tx| tx.id.as_str()) != Some("TX-12") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let list = recent.lock().unwrap();
        assert_eq!(list.len(), 10);
        assert_eq!(list[0].id, "TX-12");
        assert_eq!(list[9].id, "TX-3");
        assert!(subscriber.is_connected("transactions"));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let connector = MockConnector::refusing();
        let session = connector.with_session();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let kept = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));
        let sub = {
            let dropped = Arc::clone(&dropped);
            subscriber.subscribe(NEW_TRANSACTION, move |_| {
                dropped.fetch_add(1, Ordering::SeqCst);
            })
        };
        {
            let kept = Arc::clone(&kept);
            subscriber.subscribe(NEW_TRANSACTION, move |_| {
                kept.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(sub.unsubscribe());

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Connected).await;
        session
            .send(Ok(FeedMessage::new(NEW_TRANSACTION, transaction_json("TX-1"))))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while kept.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lost_connection_reconnects() {
        let connector = MockConnector::refusing();
        let first = connector.with_session();
        let _second = connector.with_session();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let disconnects = Arc::new(AtomicUsize::new(0));
        {
            let disconnects = Arc::clone(&disconnects);
            subscriber.on_disconnect(move |_| {
                disconnects.fetch_add(1, Ordering::SeqCst);
            });
        }
        let connects = Arc::new(AtomicUsize::new(0));
        {
            let connects = Arc::clone(&connects);
            subscriber.on_connect(move |_| {
                connects.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Connected).await;

        drop(first);
        tokio::time::timeout(Duration::from_secs(5), async {
            while connects.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.attempts(), 2);
        assert!(subscriber.is_connected("transactions"));
        assert_eq!(subscriber.retry_count("transactions"), 0);
    }

    #[tokio::test]
    async fn test_disconnect_resets_state() {
        let connector = MockConnector::refusing();
        let _session = connector.with_session();
        let subscriber = LiveFeedSubscriber::new(connector.clone(), fast_config());

        let reasons = Arc::new(Mutex::new(Vec::new()));
        {
            let reasons = Arc::clone(&reasons);
            subscriber.on_disconnect(move |event| {
                if let FeedEvent::Disconnect { reason, .. } = event {
                    reasons.lock().unwrap().push(reason.clone());
                }
            });
        }

        let mut channel = subscriber.connect("transactions");
        reach(&mut channel, ConnectionState::Connected).await;

        subscriber.disconnect("transactions").await;
        assert_eq!(subscriber.state("transactions"), ConnectionState::Disconnected);
        assert_eq!(subscriber.retry_count("transactions"), 0);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert_eq!(*reasons.lock().unwrap(), vec!["client disconnect".to_string()]);

        // No reconnect after an explicit disconnect
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_watch_state_and_unknown_channel() {
        let connector = MockConnector::refusing();
        let subscriber = LiveFeedSubscriber::new(connector, fast_config());

        assert_eq!(subscriber.state("nope"), ConnectionState::Disconnected);
        assert_eq!(subscriber.retry_count("nope"), 0);
        assert!(subscriber.watch_state("nope").is_none());
        subscriber.disconnect("nope").await;

        subscriber.on_error(|_| {});
        subscriber.on_connect_error(|_| {});
        subscriber.subscribe(NEW_TRANSACTION, |_| {});
        subscriber.subscribe_typed(NEW_TRANSACTION, |_: Transaction| {});

        subscriber.connect("transactions");
        assert!(subscriber.watch_state("transactions").is_some());
        subscriber.shutdown().await;
        assert_eq!(subscriber.state("transactions"), ConnectionState::Disconnected);
        for event in [ERROR, CONNECT_ERROR, NEW_TRANSACTION] {
            assert_eq!(subscriber.handlers.handler_count(event), 0);
        }
    }
}
