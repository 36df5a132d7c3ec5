//! # dockvisor
//!
//! **Dockvisor** launches a Docker container from a Rust program and guarantees
//! that the container goes away when the program does, including on `SIGKILL`,
//! where no cleanup code gets to run.
//!
//! The trick is a guardian child: every container is owned by a small detached
//! process (this same binary, re-executed) that stops the container as soon as
//! its parent stops sending beacons.
//!
//! ## Architecture
//! ```text
//!   your program                                   guardian child (detached)
//! ┌───────────────────────────────┐   stdin      ┌────────────────────────────────┐
//! │ ContainerSupervisor::launch() │ ───────────► │ pull ─► create ─► attach ─►    │
//! │                               │              │ start ─► wait                  │
//! │ ContainerHandle               │   "kick"     │                                │
//! │  - beacon loop (every 250ms) ─┼────────────► │ Watchdog (500ms) ◄── kick      │
//! │  - kill() ────────────────────┼── "kill" ──► │ KillSwitch ◄── kill / EOF /    │
//! │  - wait_until_stopped() ◄─────┼── exit ───── │            signal / alarm      │
//! └───────────────┬───────────────┘              └───────────────┬────────────────┘
//!                 ▼                                              ▼
//!      Bus ──► SubscriberSet ──► LogWriter, ...        Docker Engine (auto-remove)
//! ```
//!
//! ### Why a watchdog
//! A parent killed with `SIGKILL` sends nothing. On Unix the closed pipe still
//! reaches the child as end of input, but not every platform reports it
//! reliably, so the child also treats **silence** as death: a whole watchdog
//! period without a `kick` stops the container.
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Launch, beacon, kill, wait.                                  | [`ContainerSupervisor`], [`ContainerHandle`] |
//! | **Guardian**      | Child-side lifecycle with an idempotent kill.                | [`run_child`], [`KillSwitch`], [`Watchdog`] |
//! | **Engine**        | Container engine calls, Docker by default.                   | [`ContainerEngine`], [`DockerEngine`]      |
//! | **Progress**      | Launch/stop events fanned out to subscribers.                | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Timing**        | Cancellable sleep, periodic runner, never-resolve guard.     | [`sleep`], [`periodically`], [`never_resolve`] |
//! | **Readiness**     | Retry an HTTP request until the container answers.           | [`fetch_retry`], [`BackoffPolicy`]         |
//!
//! ## Binary integration
//! The supervisor re-executes [`SupervisorConfig::program`] (the current executable
//! by default) with [`CHILD_COMMAND`]. A binary that uses the supervisor must route
//! that subcommand to [`entrypoint`] and exit with its status:
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() {
//!     let args: Vec<String> = std::env::args().collect();
//!     if args.get(1).map(String::as_str) == Some(dockvisor::CHILD_COMMAND) {
//!         let code = dockvisor::entrypoint(args.get(2).map_or("", String::as_str)).await;
//!         std::process::exit(code);
//!     }
//!     // ... normal program ...
//! }
//! ```

mod beacon;
mod core;
mod engine;
mod error;
mod events;
mod fetch;
mod options;
mod subscribers;
mod time;
mod watchdog;

// ---- Public re-exports ----

pub use beacon::{Beacon, BeaconSender, SendOutcome};
pub use crate::core::{
    CHILD_COMMAND, ChildExit, ContainerHandle, ContainerSupervisor, KillReason, KillSwitch,
    MIN_WATCHDOG_PERIOD, SupervisorBuilder, SupervisorConfig, entrypoint, run_child,
    wait_for_shutdown_signal,
};
pub use engine::{ContainerEngine, DockerEngine, EngineRef, OutputStream};
pub use error::{BeaconError, ChildError, EngineError, FetchError, LaunchError, NeverResolveError};
pub use events::{Bus, Event, EventKind};
pub use fetch::{BackoffPolicy, JitterPolicy, fetch_retry};
pub use options::{ChildRequest, LaunchOptions, split_image_reference};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use time::{Wake, never_resolve, periodically, sleep};
pub use watchdog::{Alarm, Watchdog};
