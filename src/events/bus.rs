//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`].
//!
//! ```text
//! ContainerSupervisor ──┐
//! ContainerHandle     ──┼──► Bus ───► listener ───► SubscriberSet
//! beacon loop         ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items
//! - **No persistence**: events are lost if nobody is subscribed at send time

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
