//! Error types used by the dockvisor supervisor, its child process and helpers.
//!
//! - [`LaunchError`]: the supervisor could not start the guardian child.
//! - [`BeaconError`]: a beacon could not be delivered for a reason other than the child being gone.
//! - [`EngineError`]: a container engine call failed.
//! - [`ChildError`]: the guardian child gave up during setup or while waiting.
//! - [`FetchError`]: the retrying fetch hit a non-network failure.
//! - [`NeverResolveError`]: a future that must never complete did.
//!
//! Every enum has an `as_label` helper returning a stable snake_case label for logs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced while launching the guardian child.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Launch options could not be serialized for the child.
    #[error("failed to serialize launch request: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The child program could not be resolved (current executable unknown).
    #[error("failed to resolve guardian program: {0}")]
    Program(#[source] io::Error),

    /// Spawning the child process failed.
    #[error("failed to spawn guardian {program:?}: {source}")]
    Spawn {
        /// Program that was spawned.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The child was spawned without a beacon channel.
    #[error("guardian spawned without a beacon channel")]
    NoChannel,
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Serialize(_) => "launch_serialize",
            LaunchError::Program(_) => "launch_program",
            LaunchError::Spawn { .. } => "launch_spawn",
            LaunchError::NoChannel => "launch_no_channel",
        }
    }
}

/// # Unexpected beacon delivery failure.
///
/// A closed channel is **not** an error (see [`SendOutcome::PeerGone`](crate::SendOutcome));
/// this type only carries the failures that should stop the beacon loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BeaconError {
    /// Writing to the channel failed with something other than a closed pipe.
    #[error("beacon delivery failed: {0}")]
    Io(#[from] io::Error),
}

impl BeaconError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BeaconError::Io(_) => "beacon_io",
        }
    }
}

/// # Errors produced by a container engine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine endpoint could not be reached.
    #[error("failed to connect to container engine: {error}")]
    Connect {
        /// The underlying error message.
        error: String,
    },

    /// An engine operation failed.
    #[error("{op} failed for {target}: {error}")]
    Call {
        /// Operation name (`pull`, `create`, `start`, ...).
        op: &'static str,
        /// Image or container the call was about.
        target: String,
        /// The underlying error message.
        error: String,
    },
}

impl EngineError {
    /// Builds an [`EngineError::Call`].
    pub fn call(op: &'static str, target: impl Into<String>, error: impl ToString) -> Self {
        EngineError::Call {
            op,
            target: target.into(),
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Connect { .. } => "engine_connect",
            EngineError::Call { .. } => "engine_call",
        }
    }
}

/// # Errors that terminate the guardian child.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChildError {
    /// The launch request passed on the command line was malformed.
    #[error("invalid launch request: {0}")]
    Request(#[from] serde_json::Error),

    /// An engine call failed (setup failures are fatal).
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ChildError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChildError::Request(_) => "child_request",
            ChildError::Engine(e) => e.as_label(),
        }
    }
}

/// # Errors produced by [`fetch_retry`](crate::fetch::fetch_retry).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request failed for a reason that retrying cannot fix.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request body cannot be replayed, so it cannot be retried.
    #[error("request cannot be cloned for retry")]
    NotCloneable,

    /// Retrying was cancelled before a response arrived.
    #[error("fetch cancelled")]
    Canceled,
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Request(_) => "fetch_request",
            FetchError::NotCloneable => "fetch_not_cloneable",
            FetchError::Canceled => "fetch_canceled",
        }
    }
}

/// # Outcome of awaiting a future that must never complete successfully.
///
/// `Rejected` carries the inner error untouched; `E` needs no `Error` bound.
#[derive(Error, Debug)]
pub enum NeverResolveError<E> {
    /// The future completed with `Ok`, which is a logic error.
    #[error("future resolved unexpectedly")]
    UnexpectedResolve,

    /// The future failed; the original error is passed through.
    #[error("future rejected: {0:?}")]
    Rejected(E),
}

impl<E> NeverResolveError<E> {
    /// Returns the inner error if the future failed.
    pub fn into_rejection(self) -> Option<E> {
        match self {
            NeverResolveError::UnexpectedResolve => None,
            NeverResolveError::Rejected(e) => Some(e),
        }
    }

    /// Returns `true` for [`NeverResolveError::UnexpectedResolve`].
    pub fn is_unexpected_resolve(&self) -> bool {
        matches!(self, NeverResolveError::UnexpectedResolve)
    }
}
