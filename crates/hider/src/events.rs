//! Event Bus - outbound page events
//!
//! Design: one broadcast channel per page, typed enum payloads.
//! Publishing with nobody listening is not an error.

use tokio::sync::broadcast;

use crate::protocol::PageEvent;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PageEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: PageEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("[EventBus] No subscribers for page event");
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
