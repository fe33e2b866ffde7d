//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::channel::ChannelConfig;
use crate::config::BurnConfig;
use crate::error::{BurnError, BurnResult};
use crate::report::StatusEvent;
use crate::traits::ContainerRuntime;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let (orchestrator, status_rx) = OrchestratorBuilder::new()
///     .config(config)
///     .runtime(Arc::new(DockerRuntime::connect(&config)?))
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: BurnConfig,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    channel_config: ChannelConfig,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: BurnConfig::default(),
            runtime: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: BurnConfig) -> Self {
        self.config = config;
        self
    }

    /// Set an explicit worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = Some(workers);
        self
    }

    /// Set how many networks to provision
    pub fn network_count(mut self, count: usize) -> Self {
        self.config.network_count = count;
        self
    }

    /// Set the container runtime
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the orchestrator and return it along with the status receiver
    ///
    /// The receiver must be drained while the run is active; it closes once
    /// every worker has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime is not set, or if configuration
    /// validation fails.
    pub fn build(self) -> BurnResult<(Orchestrator, mpsc::Receiver<StatusEvent>)> {
        let runtime = self
            .runtime
            .ok_or_else(|| BurnError::missing_config("runtime"))?;

        self.config
            .validate()
            .map_err(|e| BurnError::config(e.to_string()))?;

        let (status_tx, status_rx) = mpsc::channel(self.channel_config.status_buffer);

        let orchestrator = Orchestrator::new(self.config, runtime, status_tx);

        Ok((orchestrator, status_rx))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
