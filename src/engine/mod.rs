//! # Container engine abstraction.
//!
//! The guardian child only needs six engine calls. [`ContainerEngine`] names
//! them so the lifecycle can run against Docker ([`DockerEngine`]) or an
//! in-memory double in tests.
//!
//! ## Contract
//! - `pull` returns only after the progress stream has been consumed to the end
//! - `attach` returns a stream of raw output chunks (stdout and stderr merged)
//! - `wait` suspends until the container exits; `Ok(None)` means "gone, code unknown"
//! - No call has a timeout; a slow pull is allowed to take as long as it takes

mod docker;
#[cfg(test)]
pub(crate) mod testing;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bollard::models::ContainerCreateBody;
use futures::Stream;

use crate::error::EngineError;

pub use docker::DockerEngine;

/// Raw container output, chunk by chunk.
pub type OutputStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, EngineError>> + Send>>;

/// Shared handle to an engine.
pub type EngineRef = Arc<dyn ContainerEngine>;

/// The engine calls the guardian child makes, in lifecycle order.
#[async_trait]
pub trait ContainerEngine: Send + Sync + 'static {
    /// Pulls `image`, following progress to completion.
    async fn pull(&self, image: &str) -> Result<(), EngineError>;

    /// Creates a container and returns its id.
    async fn create(
        &self,
        name: Option<&str>,
        body: ContainerCreateBody,
    ) -> Result<String, EngineError>;

    /// Attaches to the container's output streams.
    async fn attach(&self, id: &str) -> Result<OutputStream, EngineError>;

    /// Starts the container.
    async fn start(&self, id: &str) -> Result<(), EngineError>;

    /// Stops the container immediately, without a grace period.
    async fn stop(&self, id: &str) -> Result<(), EngineError>;

    /// Waits for the container to exit and returns its exit code, if known.
    async fn wait(&self, id: &str) -> Result<Option<i64>, EngineError>;
}
