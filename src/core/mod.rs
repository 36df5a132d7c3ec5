//! Lifecycle core: both ends of a supervised container.
//!
//! Parent side:
//! - [`supervisor`]: launches guardian children, owns the event bus;
//! - [`handle`]: beacon loop, exit watcher, `kill` and `wait_until_stopped`;
//! - [`config`]: supervisor settings and their sentinels.
//!
//! Child side:
//! - [`child`]: pull, create, attach, start, wait, with every kill trigger wired up;
//! - [`kill`]: the idempotent kill switch;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod child;
mod config;
mod handle;
mod kill;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use child::{CHILD_COMMAND, ChildExit, entrypoint, run_child};
pub use config::{MIN_WATCHDOG_PERIOD, SupervisorConfig};
pub use handle::ContainerHandle;
pub use kill::{KillReason, KillSwitch};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::ContainerSupervisor;
