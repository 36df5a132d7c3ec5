//! # Liveness beacons between the supervisor and its guardian child.
//!
//! The channel is the child's standard input. Each beacon is one line of text:
//! ```text
//! parent ── "kick\n" ──► child   (watchdog.kick())
//! parent ── "kill\n" ──► child   (kill switch)
//! parent ──   EOF    ──► child   (parent gone → kill switch)
//! ```
//!
//! ## Delivery
//! [`BeaconSender::send`] distinguishes three results:
//! - `Ok(SendOutcome::Delivered)` the line was written and flushed
//! - `Ok(SendOutcome::PeerGone)` the child closed its end (the normal way a session ends)
//! - `Err(BeaconError)` anything else
//!
//! Once the peer is gone the writer is dropped and every later send reports `PeerGone`.

use std::fmt;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::BeaconError;

/// A message from the supervisor to its guardian child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beacon {
    /// "I am still alive": resets the child's watchdog.
    Kick,
    /// "Stop the container now."
    Kill,
}

impl Beacon {
    /// Wire representation (without the trailing newline).
    pub fn as_str(self) -> &'static str {
        match self {
            Beacon::Kick => "kick",
            Beacon::Kill => "kill",
        }
    }

    /// Parses one line received by the child; surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "kick" => Some(Beacon::Kick),
            "kill" => Some(Beacon::Kill),
            _ => None,
        }
    }
}

impl fmt::Display for Beacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a send that did not fail unexpectedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The beacon was written to the channel.
    Delivered,
    /// The child already closed the channel.
    PeerGone,
}

/// Writer side of the beacon channel.
///
/// Sends are serialized through an async mutex: the beacon loop and
/// `kill()` may race, but lines are never interleaved. The lock is held for
/// the whole write, so a reader that stops draining a full pipe stalls every
/// sender; callers that must return bound the send with a timeout.
pub struct BeaconSender<W> {
    writer: Mutex<Option<W>>,
}

impl<W> BeaconSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps the writing end of the channel.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Writes one beacon line and flushes it.
    pub async fn send(&self, beacon: Beacon) -> Result<SendOutcome, BeaconError> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Ok(SendOutcome::PeerGone);
        };

        let line = format!("{beacon}\n");
        let res = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };

        match res {
            Ok(()) => Ok(SendOutcome::Delivered),
            Err(e) if is_peer_gone(&e) => {
                *guard = None;
                Ok(SendOutcome::PeerGone)
            }
            Err(e) => Err(BeaconError::Io(e)),
        }
    }

    /// Closes the channel; the child observes end of input.
    pub async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }
}

/// Errors that mean "the reader is gone" rather than "something broke".
fn is_peer_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
            | io::ErrorKind::WriteZero
    )
}
