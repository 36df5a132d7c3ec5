//! # Container supervisor: launches guardian children and reports progress.
//!
//! The [`ContainerSupervisor`] owns the event bus, the subscriber listener and
//! the configuration. Each [`launch`](ContainerSupervisor::launch) re-executes
//! the configured program as a detached guardian child, hands it the launch
//! request on the command line and returns a [`ContainerHandle`].
//!
//! ## Architecture
//! ```text
//! launch(options)
//!   ├─► force auto-remove, serialize ChildRequest
//!   ├─► Bus.publish(ContainerLaunching)
//!   ├─► spawn `<program> launch-container-subprocess <json>`
//!   │        stdin  = beacon channel (piped)
//!   │        stdout = null, stderr = inherited
//!   │        own process group (unix) / detached (windows)
//!   ├─► ContainerHandle::start (beacon loop + exit watcher)
//!   └─► Bus.publish(ContainerLaunched)
//!
//! Bus ──► SubscriberSet::listen ──► subscribers   (stops when the supervisor is dropped)
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use dockvisor::{ContainerSupervisor, LaunchOptions, LogWriter, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = ContainerSupervisor::builder(SupervisorConfig::default())
//!         .with_subscribers(vec![Arc::new(LogWriter)])
//!         .build();
//!
//!     let handle = sup.launch(LaunchOptions::new("httpd").publish("127.0.0.1", 9200, "80/tcp"))?;
//!     // ... use the container ...
//!     handle.kill().await?;
//!     handle.wait_until_stopped().await;
//!     Ok(())
//! }
//! ```

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::builder::SupervisorBuilder;
use super::child::CHILD_COMMAND;
use super::config::SupervisorConfig;
use super::handle::ContainerHandle;
use crate::error::LaunchError;
use crate::events::{Bus, Event, EventKind};
use crate::options::{ChildRequest, LaunchOptions};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Launches containers under guardian children.
pub struct ContainerSupervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    _listener: DropGuard,
}

impl ContainerSupervisor {
    /// Creates a supervisor and starts delivering events to `subscribers`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: SupervisorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        if !subscribers.is_empty() {
            let set = SubscriberSet::new(subscribers, bus.clone());
            tokio::spawn(set.listen(bus.subscribe(), token.clone()));
        }
        Self {
            cfg,
            bus,
            _listener: token.drop_guard(),
        }
    }

    /// Starts building a supervisor.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// The effective configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Subscribes to raw runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Spawns a guardian child for `options` and starts beaconing it.
    ///
    /// Auto-remove is forced on. A setup failure inside the child (pull,
    /// create, start) is **not** reported here: the handle simply stops early.
    pub fn launch(&self, options: LaunchOptions) -> Result<ContainerHandle, LaunchError> {
        let options = options.force_auto_remove();
        let label: Arc<str> = Arc::from(options.image.as_str());
        let request = ChildRequest::new(options, self.cfg.watchdog_period_clamped());
        let request_json = serde_json::to_string(&request)?;
        let program = self.cfg.program().map_err(LaunchError::Program)?;

        self.bus
            .publish(Event::new(EventKind::ContainerLaunching).with_container(Arc::clone(&label)));

        let mut cmd = Command::new(&program);
        cmd.arg(CHILD_COMMAND)
            .arg(&request_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        detach(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.bus.publish(
                    Event::new(EventKind::ContainerStopped)
                        .with_container(label)
                        .with_reason(source.to_string()),
                );
                return Err(LaunchError::Spawn { program, source });
            }
        };
        let stdin = child.stdin.take().ok_or(LaunchError::NoChannel)?;

        let handle = ContainerHandle::start(
            child,
            stdin,
            Arc::clone(&label),
            self.cfg.beacon_interval(),
            self.cfg.watchdog_period_clamped(),
            self.bus.clone(),
        );

        let mut ev = Event::new(EventKind::ContainerLaunched).with_container(label);
        if let Some(pid) = handle.pid() {
            ev = ev.with_pid(pid);
        }
        self.bus.publish(ev);
        Ok(handle)
    }
}

/// Keeps terminal signals aimed at our process group away from the child.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    cmd.process_group(0);
}

/// Starts the child without a console, in its own process group.
#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
