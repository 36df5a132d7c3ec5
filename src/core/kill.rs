//! # Idempotent container kill.
//!
//! [`KillSwitch`] stops one container at most once, however many triggers race
//! to pull it (beacon `kill`, parent disconnect, termination signal, watchdog
//! alarm).
//!
//! ## Rules
//! - The first caller wins a compare-and-swap and issues the engine `stop` call
//! - Every later caller returns `Ok(false)` immediately, without waiting
//! - A failed `stop` is reported to the winner only; the switch stays tripped

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::engine::EngineRef;
use crate::error::EngineError;

/// What pulled the kill switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    /// The parent sent a `kill` beacon.
    Requested,
    /// The beacon channel reached end of input.
    Disconnected,
    /// The process received a termination signal.
    Signal,
    /// The watchdog saw a whole period without a `kick`.
    WatchdogAlarm,
}

impl KillReason {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(self) -> &'static str {
        match self {
            KillReason::Requested => "requested",
            KillReason::Disconnected => "disconnected",
            KillReason::Signal => "signal",
            KillReason::WatchdogAlarm => "watchdog_alarm",
        }
    }
}

impl fmt::Display for KillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Stops a container exactly once.
pub struct KillSwitch {
    engine: EngineRef,
    container: String,
    tripped: AtomicBool,
}

impl KillSwitch {
    /// Creates an untripped switch for `container`.
    pub fn new(engine: EngineRef, container: impl Into<String>) -> Self {
        Self {
            engine,
            container: container.into(),
            tripped: AtomicBool::new(false),
        }
    }

    /// Stops the container if no one has yet.
    ///
    /// Returns `Ok(true)` if this call issued the stop, `Ok(false)` if an
    /// earlier call already did.
    pub async fn kill(&self, reason: KillReason) -> Result<bool, EngineError> {
        if self
            .tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }
        info!(container = %self.container, %reason, "stopping container");
        self.engine.stop(&self.container).await?;
        Ok(true)
    }

    /// Returns `true` once any caller pulled the switch.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}
