//! # Handle to a launched container.
//!
//! A [`ContainerHandle`] owns the parent side of one guardian child:
//!
//! ```text
//! beacon loop:  every interval ── "kick" ──► child stdin     (until token fires)
//! exit watcher: child.wait() ──► token.cancel() ──► ContainerStopped ──► Exited(code)
//! kill():       ContainerStopping ──► token.cancel() ──► "kill" ──► child stdin
//! ```
//!
//! ## Rules
//! - A closed channel is the expected terminal state: `kick` and `kill` both
//!   swallow it
//! - Any other delivery failure ends the beacon loop (no retry) and is
//!   published as `BeaconFailed`; the child's watchdog takes it from there
//! - `kill()` does not wait for the child; pair it with [`ContainerHandle::wait_until_stopped`]
//! - `kill()` gives up writing after one watchdog period: a child that is not
//!   draining its input gets no more kicks, so its watchdog stops the container
//! - Dropping the handle stops the beacon loop; the child then sees end of
//!   input and stops its container

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::process::{Child, ChildStdin};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use crate::beacon::{Beacon, BeaconSender, SendOutcome};
use crate::error::BeaconError;
use crate::events::{Bus, Event, EventKind};
use crate::time::{millis, periodically};

/// Lifecycle of the guardian child as seen by the exit watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildState {
    Running,
    /// Exit code, or `None` when the child was ended by a signal or could not be awaited.
    Exited(Option<i32>),
}

/// Parent-side handle to one supervised container.
pub struct ContainerHandle {
    label: Arc<str>,
    pid: Option<u32>,
    sender: Arc<BeaconSender<ChildStdin>>,
    kill_timeout: Duration,
    token: CancellationToken,
    state: watch::Receiver<ChildState>,
    bus: Bus,
    _guard: DropGuard,
}

impl ContainerHandle {
    /// Starts the beacon loop and exit watcher for a freshly spawned child.
    pub(super) fn start(
        mut child: Child,
        stdin: ChildStdin,
        label: Arc<str>,
        beacon_interval: Duration,
        kill_timeout: Duration,
        bus: Bus,
    ) -> Self {
        let pid = child.id();
        let sender = Arc::new(BeaconSender::new(stdin));
        let token = CancellationToken::new();
        let (state_tx, state) = watch::channel(ChildState::Running);

        tokio::spawn(beacon_loop(
            Arc::clone(&sender),
            beacon_interval,
            token.clone(),
            bus.clone(),
            Arc::clone(&label),
        ));

        {
            let token = token.clone();
            let bus = bus.clone();
            let label = Arc::clone(&label);
            tokio::spawn(async move {
                let status = child.wait().await;
                token.cancel();

                let mut ev = Event::new(EventKind::ContainerStopped).with_container(label);
                let code = match status {
                    Ok(status) => match status.code() {
                        Some(code) => {
                            ev = ev.with_exit_code(code);
                            Some(code)
                        }
                        None => {
                            ev = ev.with_reason(status.to_string());
                            None
                        }
                    },
                    Err(e) => {
                        ev = ev.with_reason(e.to_string());
                        None
                    }
                };
                bus.publish(ev);
                state_tx.send_replace(ChildState::Exited(code));
            });
        }

        Self {
            label,
            pid,
            sender,
            kill_timeout,
            _guard: token.clone().drop_guard(),
            token,
            state,
            bus,
        }
    }

    /// Label the container is reported under (its image reference).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// OS pid of the guardian child, if it was known at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns `true` once the guardian child has exited.
    pub fn is_stopped(&self) -> bool {
        *self.state.borrow() != ChildState::Running
    }

    /// Exit code of the guardian child.
    ///
    /// `None` while it runs, and also when it was ended by a signal.
    /// The guardian exits `0` after a requested stop and non-zero when it
    /// failed to bring the container up.
    pub fn exit_code(&self) -> Option<i32> {
        match *self.state.borrow() {
            ChildState::Running => None,
            ChildState::Exited(code) => code,
        }
    }

    /// Asks the child to stop its container.
    ///
    /// Stops the beacon loop and sends `kill`. Returns once the message is
    /// written, the channel is known to be closed, or one watchdog period has
    /// passed without the child reading. The last two count as success.
    pub async fn kill(&self) -> Result<(), BeaconError> {
        self.bus
            .publish(Event::new(EventKind::ContainerStopping).with_container(Arc::clone(&self.label)));
        self.token.cancel();
        send_kill(&self.sender, self.kill_timeout, &self.label).await
    }

    /// Suspends until the guardian child has exited. May be called any number of times.
    pub async fn wait_until_stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s != ChildState::Running).await;
    }
}

/// Writes `kill`, giving up after `limit`.
///
/// With the beacon loop already cancelled, a child that never reads the line
/// also never sees another kick and its watchdog fires instead.
async fn send_kill<W>(sender: &BeaconSender<W>, limit: Duration, label: &str) -> Result<(), BeaconError>
where
    W: AsyncWrite + Unpin + Send,
{
    match tokio::time::timeout(limit, sender.send(Beacon::Kill)).await {
        Ok(Ok(SendOutcome::Delivered | SendOutcome::PeerGone)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!(
                container = %label,
                timeout_ms = millis(limit),
                "kill not written, leaving the stop to the child's watchdog"
            );
            Ok(())
        }
    }
}

/// Sends `kick` every `interval` until cancelled or a send fails unexpectedly.
async fn beacon_loop<W>(
    sender: Arc<BeaconSender<W>>,
    interval: Duration,
    token: CancellationToken,
    bus: Bus,
    label: Arc<str>,
) where
    W: AsyncWrite + Unpin + Send + Sync + 'static,
{
    let res = periodically(
        || {
            let sender = Arc::clone(&sender);
            async move { sender.send(Beacon::Kick).await.map(drop) }
        },
        interval,
        Some(&token),
    )
    .await;

    if let Err(e) = res {
        warn!(container = %label, label = e.as_label(), error = %e, "beacon loop stopped");
        bus.publish(
            Event::new(EventKind::BeaconFailed)
                .with_container(label)
                .with_reason(e.to_string()),
        );
        token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, duplex};

    struct Refusing;

    impl AsyncWrite for Refusing {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::PermissionDenied)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_kick_publishes_once_and_cancels() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();

        beacon_loop(
            Arc::new(BeaconSender::new(Refusing)),
            Duration::from_millis(250),
            token.clone(),
            bus,
            Arc::from("httpd"),
        )
        .await;

        assert!(token.is_cancelled());
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::BeaconFailed);
        assert_eq!(ev.container.as_deref(), Some("httpd"));
        assert!(ev.reason.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_loop_publishes_nothing() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let (writer, mut reader) = duplex(64);

        let task = tokio::spawn(beacon_loop(
            Arc::new(BeaconSender::new(writer)),
            Duration::from_millis(250),
            token.clone(),
            bus,
            Arc::from("httpd"),
        ));
        tokio::time::sleep(Duration::from_millis(600)).await;
        token.cancel();
        task.await.unwrap();

        // Sender dropped with the loop: the reader sees the kicks, then EOF.
        let mut got = String::new();
        reader.read_to_string(&mut got).await.unwrap();
        assert!(got.lines().count() >= 2);
        assert!(got.lines().all(|l| l == "kick"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn kill_to_a_stalled_reader_gives_up_after_the_limit() {
        // Nobody reads and the buffer is smaller than one line.
        let (writer, _reader) = duplex(2);
        let sender = BeaconSender::new(writer);

        let started = tokio::time::Instant::now();
        send_kill(&sender, Duration::from_millis(500), "httpd")
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn kill_to_a_closed_reader_succeeds() {
        let (writer, reader) = duplex(64);
        drop(reader);
        let sender = BeaconSender::new(writer);
        send_kill(&sender, Duration::from_millis(500), "httpd")
            .await
            .unwrap();
    }
}
