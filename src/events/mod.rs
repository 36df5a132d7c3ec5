//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ContainerSupervisor::launch`, `ContainerHandle` (kill, exit
//!   watcher, beacon loop), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the listener spawned by `ContainerSupervisor`, which fans out
//!   to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
