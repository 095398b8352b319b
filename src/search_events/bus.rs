//! Broadcast bus for search events

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, broadcast};

use super::errors::EventBusError;
use super::metrics::EventBusMetrics;
use super::streaming::FilteredReceiver;
use super::types::SearchEvent;

/// Event bus for publishing and subscribing to search events
///
/// Clones share the same channel. Slow receivers lose the oldest events
/// (`RecvError::Lagged`) rather than slowing down the search. `shutdown()`
/// drops the sender, so every receiver sees the channel close.
#[derive(Debug, Clone)]
pub struct SearchEventBus {
    sender: Arc<RwLock<Option<broadcast::Sender<SearchEvent>>>>,
    metrics: EventBusMetrics,
    shutdown: Arc<Notify>,
    shutdown_flag: Arc<AtomicBool>,
}

impl SearchEventBus {
    /// Create a new event bus buffering up to `capacity` events per receiver
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(RwLock::new(Some(sender))),
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody is listening
    /// * `Err(EventBusError::Shutdown)` - `shutdown()` was called
    pub fn publish(&self, event: SearchEvent) -> Result<usize, EventBusError> {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            return Err(EventBusError::Shutdown);
        };
        match sender.send(event) {
            Ok(count) => {
                self.metrics.record_published(count);
                Ok(count)
            }
            Err(_) => {
                self.metrics.record_unobserved();
                Err(EventBusError::NoSubscribers)
            }
        }
    }

    /// Subscribe to events published from now on
    ///
    /// After shutdown the returned receiver is already closed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        match self.sender.read().as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Create a subscriber that only receives events passing `filter`
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&SearchEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Close the channel for every subscriber
    ///
    /// Receivers get the events already buffered, then `RecvError::Closed`.
    /// Idempotent. Later publishes fail with `EventBusError::Shutdown`.
    pub fn shutdown(&self) {
        let sender = self.sender.write().take();
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if sender.is_some() {
            log::debug!("Search event bus shut down");
        }
    }

    /// Wait for the shutdown signal
    pub async fn wait_for_shutdown(&self) {
        if self.is_shutdown() {
            return;
        }
        self.shutdown.notified().await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }
}
