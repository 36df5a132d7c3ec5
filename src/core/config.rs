//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`]: centralized settings for launching guardian children.
//!
//! ## Sentinel values
//! - `beacon_interval = 0s` → half the watchdog period
//! - `program = None` → the current executable
//!
//! ## Rules
//! - The watchdog period is clamped to at least [`MIN_WATCHDOG_PERIOD`]
//! - The beacon interval is always strictly shorter than the watchdog period;
//!   any value that is not falls back to half the period
//! - Bus capacity is clamped to at least 1

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted watchdog period.
pub const MIN_WATCHDOG_PERIOD: Duration = Duration::from_millis(10);

/// Configuration for [`ContainerSupervisor`](crate::ContainerSupervisor).
///
/// All fields are public; prefer the accessors, which apply sentinels and clamps.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Child watchdog period: the child kills its container after a whole
    /// period without a beacon.
    pub watchdog_period: Duration,

    /// Time between `kick` beacons (`0s` = half the watchdog period).
    pub beacon_interval: Duration,

    /// Program spawned as the guardian child (`None` = current executable).
    ///
    /// The program must understand the
    /// [`CHILD_COMMAND`](crate::CHILD_COMMAND) subcommand.
    pub program: Option<PathBuf>,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the watchdog period clamped to [`MIN_WATCHDOG_PERIOD`].
    #[inline]
    pub fn watchdog_period_clamped(&self) -> Duration {
        self.watchdog_period.max(MIN_WATCHDOG_PERIOD)
    }

    /// Returns the effective beacon interval.
    ///
    /// - `0s` → half the watchdog period
    /// - `>= watchdog period` → half the watchdog period
    /// - otherwise the configured value
    #[inline]
    pub fn beacon_interval(&self) -> Duration {
        let period = self.watchdog_period_clamped();
        if self.beacon_interval.is_zero() || self.beacon_interval >= period {
            period / 2
        } else {
            self.beacon_interval
        }
    }

    /// Resolves the program to spawn as the guardian child.
    pub fn program(&self) -> io::Result<PathBuf> {
        match &self.program {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe(),
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `watchdog_period = 500ms`
    /// - `beacon_interval = 0s` (half the period, 250ms)
    /// - `program = None` (current executable)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            watchdog_period: Duration::from_millis(500),
            beacon_interval: Duration::ZERO,
            program: None,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_beacon_at_half_the_watchdog_period() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.watchdog_period_clamped(), Duration::from_millis(500));
        assert_eq!(cfg.beacon_interval(), Duration::from_millis(250));
    }

    #[test]
    fn beacon_interval_must_be_shorter_than_period() {
        let cfg = SupervisorConfig {
            beacon_interval: Duration::from_millis(500),
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.beacon_interval(), Duration::from_millis(250));

        let cfg = SupervisorConfig {
            beacon_interval: Duration::from_millis(100),
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.beacon_interval(), Duration::from_millis(100));
    }

    #[test]
    fn clamps_tiny_values() {
        let cfg = SupervisorConfig {
            watchdog_period: Duration::from_millis(1),
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.watchdog_period_clamped(), MIN_WATCHDOG_PERIOD);
        assert_eq!(cfg.beacon_interval(), Duration::from_millis(5));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn explicit_program_wins() {
        let cfg = SupervisorConfig {
            program: Some(PathBuf::from("/usr/local/bin/dockvisor")),
            ..SupervisorConfig::default()
        };
        assert_eq!(
            cfg.program().unwrap(),
            PathBuf::from("/usr/local/bin/dockvisor")
        );
    }
}
