use std::sync::Arc;

use super::config::SupervisorConfig;
use super::supervisor::ContainerSupervisor;
use crate::subscribers::Subscribe;

/// Builder for [`ContainerSupervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets progress subscribers.
    ///
    /// Subscribers receive launch and stop events through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor. Must be called inside a tokio runtime.
    pub fn build(self) -> ContainerSupervisor {
        ContainerSupervisor::new(self.cfg, self.subscribers)
    }
}
