//! # Watchdog timer.
//!
//! A [`Watchdog`] raises an [`Alarm`] at the end of every period in which it
//! was not kicked. It is the guardian child's only way to notice that its
//! parent vanished on platforms without termination signals: beacons stop,
//! kicks stop, alarms start.
//!
//! ## State machine (evaluated once per period)
//! ```text
//!            kick()                     period elapsed
//!   armed ──────────► kicked ─────────────────────────► armed   (no alarm)
//!     │
//!     └──────────────────────────────────────────────► armed   (alarm, missed += 1)
//!                       period elapsed
//! ```
//!
//! ## Rules
//! - `kick()` never moves the period boundary; it only marks the current period
//! - Alarms **repeat** every period until the next kick
//! - Cancellation is **terminal**: no more alarms, no more transitions
//! - The timer also stops once every [`Watchdog`] handle is dropped

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Raised when a whole period passed without a kick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarm {
    /// Consecutive silent periods, starting at 1.
    pub missed: u32,
}

struct Inner {
    kicked: AtomicBool,
    missed: AtomicU32,
    alarms: broadcast::Sender<Alarm>,
    token: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Repeating timer that alarms unless kicked every period.
///
/// Cheap to clone; all clones drive the same timer.
#[derive(Clone)]
pub struct Watchdog {
    inner: Arc<Inner>,
}

impl Watchdog {
    /// Starts a watchdog with the given period.
    ///
    /// The watchdog starts `armed`: without a kick, the first alarm fires one
    /// period from now. If `cancel` is given, firing it stops the watchdog for good.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(period: Duration, cancel: Option<&CancellationToken>) -> Self {
        let token = match cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let (alarms, _rx) = broadcast::channel(16);
        let inner = Arc::new(Inner {
            kicked: AtomicBool::new(false),
            missed: AtomicU32::new(0),
            alarms,
            token: token.clone(),
        });

        tokio::spawn(tick_loop(Arc::downgrade(&inner), period, token));
        Self { inner }
    }

    /// Marks the current period as kicked.
    #[inline]
    pub fn kick(&self) {
        self.inner.kicked.store(true, Ordering::Release);
    }

    /// Stops the watchdog permanently.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    /// Returns `true` once the watchdog has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns a receiver that observes every subsequent alarm.
    pub fn subscribe(&self) -> broadcast::Receiver<Alarm> {
        self.inner.alarms.subscribe()
    }

    /// Calls `handler` for every subsequent alarm.
    ///
    /// The handler is deregistered when the watchdog is cancelled or dropped.
    pub fn on_alarm<F>(&self, handler: F)
    where
        F: Fn(Alarm) + Send + Sync + 'static,
    {
        let mut rx = self.subscribe();
        let token = self.inner.token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(alarm) => handler(alarm),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }
}

/// Evaluates the state machine once per period until cancelled or orphaned.
async fn tick_loop(inner: Weak<Inner>, period: Duration, token: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                if inner.kicked.swap(false, Ordering::AcqRel) {
                    inner.missed.store(0, Ordering::Release);
                } else {
                    let missed = inner.missed.fetch_add(1, Ordering::AcqRel) + 1;
                    let _ = inner.alarms.send(Alarm { missed });
                }
            }
        }
    }
}
