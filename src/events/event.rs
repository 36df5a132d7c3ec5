//! # Runtime events emitted by the container supervisor.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Progress events**: a container's launch and stop, keyed by its label
//! - **Delivery events**: beacon and subscriber failures
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! container label, child pid, exit code and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use dockvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ContainerStopped)
//!     .with_container("httpd")
//!     .with_exit_code(0);
//!
//! assert_eq!(ev.kind, EventKind::ContainerStopped);
//! assert_eq!(ev.container.as_deref(), Some("httpd"));
//! assert_eq!(ev.exit_code, Some(0));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Progress events ===
    /// The guardian child is about to be spawned.
    ///
    /// Sets: `container`
    ContainerLaunching,

    /// The guardian child is running and beacons have started.
    ///
    /// Sets: `container`, `pid` (if the OS reported one)
    ContainerLaunched,

    /// The caller asked for the container to be stopped.
    ///
    /// Sets: `container`
    ContainerStopping,

    /// The guardian child exited (container stopped, or setup failed).
    ///
    /// Sets: `container`, `exit_code` (child's exit status, if any)
    ContainerStopped,

    // === Delivery events ===
    /// The beacon loop ended on an unexpected send failure.
    ///
    /// Sets: `container`, `reason`
    BeaconFailed,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `container` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `container` (subscriber name), `reason` (`full` or `closed`)
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Container label (the image reference) or subscriber name.
    pub container: Option<Arc<str>>,
    /// Guardian child pid.
    pub pid: Option<u32>,
    /// Guardian child exit status.
    pub exit_code: Option<i32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            container: None,
            pid: None,
            exit_code: None,
            reason: None,
        }
    }

    /// Attaches a container label.
    #[inline]
    pub fn with_container(mut self, label: impl Into<Arc<str>>) -> Self {
        self.container = Some(label.into());
        self
    }

    /// Attaches the guardian child's pid.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches the guardian child's exit status.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_container(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_container(subscriber)
            .with_reason(info)
    }
}
