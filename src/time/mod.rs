//! Cancellable timing primitives.
//!
//! ## Contents
//! - [`sleep`] suspend for a duration or until a [`CancellationToken`](tokio_util::sync::CancellationToken) fires
//! - [`periodically`] run an action on a fixed interval until cancelled
//! - [`never_resolve`] await a future that must never complete successfully
//! - [`millis`] whole milliseconds of a duration, saturating at `u64::MAX`
//!
//! ## Quick wiring
//! ```text
//! ContainerHandle beacon loop ──► periodically(send kick, beacon_interval, token)
//!                                      └─► sleep(interval, token)  (between sends)
//! fetch_retry ──► sleep(backoff, cancel)                           (between attempts)
//! ```

mod never;
mod periodic;
mod sleep;

pub use never::never_resolve;
pub use periodic::periodically;
pub use sleep::{Wake, sleep};

use std::time::Duration;

/// Whole milliseconds in `d`, saturating instead of truncating.
#[inline]
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
