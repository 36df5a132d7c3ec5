//! # Sleep with cancellation.
//!
//! [`sleep`] waits for either the duration to elapse or the token to fire,
//! whichever comes first. The timer is dropped on both paths, so an early
//! cancellation never leaves a pending timer behind.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

/// Why a [`sleep`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration elapsed.
    Elapsed,
    /// The cancellation token fired first.
    Cancelled,
}

impl Wake {
    /// Returns `true` if the sleep was cut short.
    #[inline]
    pub fn is_cancelled(self) -> bool {
        matches!(self, Wake::Cancelled)
    }
}

/// Suspends for `dur`, or until `cancel` fires.
///
/// Never fails. An already-cancelled token returns [`Wake::Cancelled`] immediately.
pub async fn sleep(dur: Duration, cancel: Option<&CancellationToken>) -> Wake {
    let Some(token) = cancel else {
        time::sleep(dur).await;
        return Wake::Elapsed;
    };

    let sleep = time::sleep(dur);
    tokio::pin!(sleep);
    select! {
        biased;
        _ = token.cancelled() => Wake::Cancelled,
        _ = &mut sleep => Wake::Elapsed,
    }
}
