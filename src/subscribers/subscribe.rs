//! # Subscriber trait
//!
//! `Subscribe` is how progress reporting plugs into the supervisor. Each
//! subscriber is driven by a dedicated worker loop fed by a bounded queue owned
//! by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, network calls); they block neither the
//!   supervisor nor other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are **dropped** and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use dockvisor::{Event, EventKind, Subscribe};
//!
//! struct Progress;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Progress {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ContainerLaunched {
//!             // start a spinner for ev.container ...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "progress" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
