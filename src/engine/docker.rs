//! # Docker engine over the local daemon socket.
//!
//! Thin adapter from [`ContainerEngine`] to `bollard`. Two Docker quirks are
//! absorbed here:
//! - `stop` is immediate (`t=0`): the daemon sends SIGKILL without a grace period
//! - `stop` on a container that is already stopped (304) or gone (404) succeeds
//! - `wait` on a container that auto-removed before the wait registered (404)
//!   reports an unknown exit code instead of failing

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::{
    AttachContainerOptionsBuilder, CreateContainerOptionsBuilder, CreateImageOptionsBuilder,
    StartContainerOptions, StopContainerOptions, StopContainerOptionsBuilder,
    WaitContainerOptions,
};
use futures::StreamExt;
use tracing::debug;

use super::{ContainerEngine, OutputStream};
use crate::error::EngineError;
use crate::options::split_image_reference;

/// [`ContainerEngine`] backed by the Docker daemon.
#[derive(Clone, Debug)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using `DOCKER_HOST` or the platform default socket.
    pub fn connect() -> Result<Self, EngineError> {
        Docker::connect_with_local_defaults()
            .map(Self::from_client)
            .map_err(|e| EngineError::Connect {
                error: e.to_string(),
            })
    }

    /// Wraps an existing client.
    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        let (repo, tag) = split_image_reference(image);
        let mut options = CreateImageOptionsBuilder::new().from_image(repo);
        if let Some(tag) = tag {
            options = options.tag(tag);
        }

        let progress = self.docker.create_image(Some(options.build()), None, None);
        tokio::pin!(progress);
        while let Some(info) = progress.next().await {
            let info = info.map_err(|e| EngineError::call("pull", image, e))?;
            if let Some(status) = info.status.as_deref() {
                debug!(
                    image,
                    status,
                    progress = info.progress.as_deref().unwrap_or_default(),
                    "pull progress"
                );
            }
        }
        Ok(())
    }

    async fn create(
        &self,
        name: Option<&str>,
        body: ContainerCreateBody,
    ) -> Result<String, EngineError> {
        let target = name.or(body.image.as_deref()).unwrap_or("container").to_string();
        let options = name.map(|n| CreateContainerOptionsBuilder::new().name(n).build());

        let created = self
            .docker
            .create_container(options, body)
            .await
            .map_err(|e| EngineError::call("create", target, e))?;
        for warning in &created.warnings {
            debug!(id = %created.id, warning = %warning, "create warning");
        }
        Ok(created.id)
    }

    async fn attach(&self, id: &str) -> Result<OutputStream, EngineError> {
        let options = AttachContainerOptionsBuilder::new()
            .stream(true)
            .stdout(true)
            .stderr(true)
            .build();
        let attached = self
            .docker
            .attach_container(id, Some(options))
            .await
            .map_err(|e| EngineError::call("attach", id, e))?;

        let target = id.to_string();
        let output = attached.output.map(move |chunk| {
            chunk
                .map(|out| out.into_bytes().to_vec())
                .map_err(|e| EngineError::call("attach", target.clone(), e))
        });
        Ok(Box::pin(output))
    }

    async fn start(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| EngineError::call("start", id, e))
    }

    async fn stop(&self, id: &str) -> Result<(), EngineError> {
        match self
            .docker
            .stop_container(id, Some(force_stop_options()))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if has_status(&e, 304) || has_status(&e, 404) => Ok(()),
            Err(e) => Err(EngineError::call("stop", id, e)),
        }
    }

    async fn wait(&self, id: &str) -> Result<Option<i64>, EngineError> {
        let exits = self.docker.wait_container(id, None::<WaitContainerOptions>);
        tokio::pin!(exits);
        match exits.next().await {
            Some(Ok(resp)) => Ok(Some(resp.status_code)),
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(Some(code)),
            Some(Err(e)) if has_status(&e, 404) => Ok(None),
            Some(Err(e)) => Err(EngineError::call("wait", id, e)),
            None => Ok(None),
        }
    }
}

/// Stop without a grace period: PID 1 may ignore SIGTERM.
fn force_stop_options() -> StopContainerOptions {
    StopContainerOptionsBuilder::new().t(0).build()
}

fn has_status(error: &BollardError, status: u16) -> bool {
    matches!(
        error,
        BollardError::DockerResponseServerError { status_code, .. } if *status_code == status
    )
}
