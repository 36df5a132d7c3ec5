//! # Guardian child.
//!
//! The process the supervisor spawns for each container. It owns the
//! container for its whole life and makes sure it stops when the parent does.
//!
//! ```text
//! pull ─► create (auto-remove) ─► attach ─► start ─► wait ──────────► exit
//!                                                     ▲
//!          stdin "kick" ──► watchdog.kick()           │
//!          stdin "kill" ──┐                           │
//!          stdin EOF    ──┤                           │
//!          SIGTERM/INT  ──┼──► KillSwitch ── stop ────┘
//!          watchdog alarm ┘
//! ```
//!
//! ## Rules
//! - Setup failures (pull, create, attach, start) are fatal and not retried
//! - Every trigger goes through one [`KillSwitch`]: the container is stopped once
//! - The child returns only after the container's wait resolves
//! - Handlers and the watchdog are torn down before returning

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::kill::{KillReason, KillSwitch};
use super::shutdown::wait_for_shutdown_signal;
use crate::beacon::Beacon;
use crate::engine::{DockerEngine, EngineRef, OutputStream};
use crate::error::ChildError;
use crate::options::ChildRequest;
use crate::watchdog::Watchdog;

/// Subcommand under which the supervisor re-executes itself as the guardian child.
pub const CHILD_COMMAND: &str = "launch-container-subprocess";

/// How the guardian child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    /// Container exit code, if the engine reported one.
    pub exit_code: Option<i64>,
    /// What stopped the container (`None` if it exited on its own).
    pub killed_by: Option<KillReason>,
}

/// Entry point of the `launch-container-subprocess` subcommand.
///
/// Reads beacons from stdin and listens for termination signals. Returns the
/// process exit status: `0` once the container has exited, `1` on failure.
pub async fn entrypoint(request_json: &str) -> i32 {
    match run_from_json(request_json).await {
        Ok(exit) => {
            info!(
                exit_code = ?exit.exit_code,
                killed_by = ?exit.killed_by,
                "container exited"
            );
            0
        }
        Err(e) => {
            error!(label = e.as_label(), error = %e, "guardian failed");
            1
        }
    }
}

async fn run_from_json(request_json: &str) -> Result<ChildExit, ChildError> {
    let request: ChildRequest = serde_json::from_str(request_json)?;
    let engine: EngineRef = Arc::new(DockerEngine::connect()?);
    let beacons = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!(error = %e, "termination signals unavailable");
            std::future::pending::<()>().await;
        }
    };
    run_child(engine, request, beacons, shutdown).await
}

/// Runs one container to completion under beacon supervision.
///
/// - `beacons`: the channel from the parent, one [`Beacon`] per line
/// - `shutdown`: resolves when the process is asked to terminate
pub async fn run_child<R, S>(
    engine: EngineRef,
    request: ChildRequest,
    beacons: R,
    shutdown: S,
) -> Result<ChildExit, ChildError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let period = request.watchdog_period();
    let options = request.options;
    let name = options.name.clone();

    engine.pull(&options.image).await?;
    let id = engine
        .create(name.as_deref(), options.into_create_body())
        .await?;
    let output = engine.attach(&id).await?;
    let relay = tokio::spawn(relay_output(output));
    if let Err(e) = engine.start(&id).await {
        relay.abort();
        return Err(e.into());
    }
    info!(container = %id, "container started");

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let (kill_tx, mut kill_rx) = mpsc::unbounded_channel::<KillReason>();

    let watchdog = Watchdog::new(period, Some(&token));
    {
        let kill_tx = kill_tx.clone();
        watchdog.on_alarm(move |alarm| {
            warn!(missed = alarm.missed, "no beacon within watchdog period");
            let _ = kill_tx.send(KillReason::WatchdogAlarm);
        });
    }
    tokio::spawn(listen_beacons(
        beacons,
        watchdog.clone(),
        kill_tx.clone(),
        token.clone(),
    ));
    {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = shutdown => { let _ = kill_tx.send(KillReason::Signal); }
            }
        });
    }

    let switch = KillSwitch::new(Arc::clone(&engine), id.clone());
    let mut killed_by = None;
    let wait = engine.wait(&id);
    tokio::pin!(wait);

    let exit_code = loop {
        tokio::select! {
            res = &mut wait => break res?,
            Some(reason) = kill_rx.recv() => {
                if switch.kill(reason).await? {
                    killed_by = Some(reason);
                }
            }
        }
    };

    watchdog.cancel();
    token.cancel();
    if tokio::time::timeout(period, relay).await.is_err() {
        debug!(container = %id, "output relay did not drain");
    }
    Ok(ChildExit {
        exit_code,
        killed_by,
    })
}

/// Turns beacon lines into watchdog kicks and kill requests.
async fn listen_beacons<R>(
    beacons: R,
    watchdog: Watchdog,
    kill: mpsc::UnboundedSender<KillReason>,
    token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = beacons.lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => match Beacon::parse(&line) {
                Some(Beacon::Kick) => watchdog.kick(),
                Some(Beacon::Kill) => {
                    let _ = kill.send(KillReason::Requested);
                }
                None => warn!(line = %line.trim(), "ignoring unknown beacon"),
            },
            Ok(None) => {
                let _ = kill.send(KillReason::Disconnected);
                return;
            }
            Err(e) => {
                warn!(error = %e, "beacon channel failed");
                let _ = kill.send(KillReason::Disconnected);
                return;
            }
        }
    }
}

/// Copies container output to our stderr until the stream ends.
async fn relay_output(mut output: OutputStream) {
    let mut stderr = tokio::io::stderr();
    while let Some(chunk) = output.next().await {
        match chunk {
            Ok(bytes) => {
                if stderr.write_all(&bytes).await.is_err() {
                    break;
                }
                let _ = stderr.flush().await;
            }
            Err(e) => {
                debug!(error = %e, "container output ended");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeEngine, STOPPED_CODE};
    use crate::options::LaunchOptions;
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;
    use tokio::time::{self, Instant};

    const PERIOD: Duration = Duration::from_millis(500);

    fn request() -> ChildRequest {
        ChildRequest::new(LaunchOptions::new("httpd").with_name("web"), PERIOD)
    }

    fn spawn_child<S>(
        engine: &Arc<FakeEngine>,
        shutdown: S,
    ) -> (DuplexStream, JoinHandle<Result<ChildExit, ChildError>>)
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = tokio::io::duplex(256);
        let engine: EngineRef = engine.clone();
        let handle = tokio::spawn(run_child(engine, request(), BufReader::new(rx), shutdown));
        (tx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn kicks_keep_the_container_running() {
        let engine = Arc::new(FakeEngine::default());
        let (mut tx, handle) = spawn_child(&engine, std::future::pending());

        tx.write_all(b"hello\n").await.unwrap();
        for _ in 0..12 {
            tx.write_all(b"kick\n").await.unwrap();
            time::sleep(PERIOD / 2).await;
        }
        assert_eq!(engine.stops(), 0);

        engine.exit(0);
        let exit = handle.await.unwrap().unwrap();
        assert_eq!(
            exit,
            ChildExit {
                exit_code: Some(0),
                killed_by: None
            }
        );
        assert_eq!(
            engine.calls(),
            vec!["pull", "create", "attach", "start", "wait"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn created_container_auto_removes() {
        let engine = Arc::new(FakeEngine::default());
        let (_tx, handle) = spawn_child(&engine, std::future::pending());

        engine.exit(0);
        handle.await.unwrap().unwrap();
        let body = engine.created().unwrap();
        assert_eq!(body.image.as_deref(), Some("httpd"));
        assert_eq!(body.host_config.and_then(|h| h.auto_remove), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn kill_beacon_stops_the_container() {
        let engine = Arc::new(FakeEngine::default());
        let (mut tx, handle) = spawn_child(&engine, std::future::pending());

        tx.write_all(b"kick\nkill\n").await.unwrap();
        let exit = handle.await.unwrap().unwrap();

        assert_eq!(exit.killed_by, Some(KillReason::Requested));
        assert_eq!(exit.exit_code, Some(STOPPED_CODE));
        assert_eq!(engine.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_disconnect_stops_the_container() {
        let engine = Arc::new(FakeEngine::default());
        let (tx, handle) = spawn_child(&engine, std::future::pending());

        drop(tx);
        let exit = handle.await.unwrap().unwrap();
        assert_eq!(exit.killed_by, Some(KillReason::Disconnected));
        assert_eq!(engine.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_parent_trips_the_watchdog() {
        let engine = Arc::new(FakeEngine::default());
        let start = Instant::now();
        let (_tx, handle) = spawn_child(&engine, std::future::pending());

        let exit = handle.await.unwrap().unwrap();
        assert_eq!(exit.killed_by, Some(KillReason::WatchdogAlarm));
        assert!(start.elapsed() <= PERIOD * 2);
        assert_eq!(engine.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn racing_triggers_stop_once() {
        let engine = Arc::new(FakeEngine::default());
        let (mut tx, handle) = spawn_child(&engine, async {});

        tx.write_all(b"kill\nkill\n").await.unwrap();
        drop(tx);
        let exit = handle.await.unwrap().unwrap();

        assert!(exit.killed_by.is_some());
        assert_eq!(engine.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn setup_failure_is_fatal() {
        let engine = Arc::new(FakeEngine::default().failing_on("start"));
        let (_tx, handle) = spawn_child(&engine, std::future::pending());

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ChildError::Engine(_)));
        assert_eq!(engine.calls(), vec!["pull", "create", "attach", "start"]);
        assert_eq!(engine.stops(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stop_terminates_the_child() {
        let engine = Arc::new(FakeEngine::default().failing_stop());
        let (tx, handle) = spawn_child(&engine, std::future::pending());

        drop(tx);
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.as_label(), "engine_call");
    }

    #[tokio::test]
    async fn malformed_request_exits_with_failure() {
        assert_eq!(entrypoint("{not json").await, 1);
    }
}
