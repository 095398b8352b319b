//! Filtered event receivers

use std::sync::Arc;
use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::types::SearchEvent;

/// Receiver that skips events not passing a filter
pub struct FilteredReceiver<F>
where
    F: Fn(&SearchEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<SearchEvent>,
    filter: Arc<F>,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&SearchEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<SearchEvent>, filter: F) -> Self {
        Self {
            receiver,
            filter: Arc::new(filter),
        }
    }

    /// Receive the next event that passes the filter
    pub async fn recv(&mut self) -> Result<SearchEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.filter)(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return Err(EventBusError::Shutdown),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }
}
