//! Docker Engine runtime

use std::collections::BTreeMap;

use async_trait::async_trait;
use bollard::container::{CreateContainerOptions, StartContainerOptions, WaitContainerOptions};
use bollard::image::CreateImageOptions;
use bollard::network::{CreateNetworkOptions, PruneNetworksOptions};
use bollard::Docker;
use futures::StreamExt;

use containerburn_core::{
    BurnConfig, BurnError, BurnResult, ContainerExit, ContainerRuntime, ContainerSpec,
    LabelSelector, PullStream, RuntimeError,
};

use crate::convert::{
    container_config, exit_from_wait, into_id, label_filters, network_labels, pull_progress,
    runtime_error,
};

/// `ContainerRuntime` backed by the Docker Engine API
///
/// Cloning is cheap; bollard shares the underlying connection pool.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    network_driver: String,
}

impl DockerRuntime {
    /// Connect using the process environment (`DOCKER_HOST` and friends)
    ///
    /// The daemon is pinged once so an unreachable runtime fails here
    /// rather than at the first workload.
    pub async fn connect(config: &BurnConfig) -> BurnResult<Self> {
        let docker = Docker::connect_with_defaults()
            .map_err(|e| BurnError::Connect(RuntimeError::Connection(e.to_string())))?;

        docker
            .ping()
            .await
            .map_err(|e| BurnError::Connect(RuntimeError::Connection(e.to_string())))?;

        tracing::debug!(driver = %config.network_driver, "Connected to Docker daemon");

        Ok(Self {
            docker,
            network_driver: config.network_driver.clone(),
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn runtime_name(&self) -> &str {
        "docker"
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        Box::pin(
            self.docker
                .create_image(Some(options), None, None)
                .map(|item| item.map(pull_progress).map_err(runtime_error)),
        )
    }

    async fn prune_networks(&self, selector: &LabelSelector) -> Result<usize, RuntimeError> {
        let options = PruneNetworksOptions {
            filters: label_filters(selector),
        };

        let response = self
            .docker
            .prune_networks(Some(options))
            .await
            .map_err(runtime_error)?;

        let deleted = response.networks_deleted.unwrap_or_default();
        for name in &deleted {
            tracing::debug!(network = %name, "Pruned network");
        }
        Ok(deleted.len())
    }

    async fn create_network(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<String, RuntimeError> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: self.network_driver.clone(),
            labels: network_labels(labels),
            ..Default::default()
        };

        let response = self
            .docker
            .create_network(options)
            .await
            .map_err(runtime_error)?;

        into_id(response.id)
            .ok_or_else(|| RuntimeError::Other(format!("daemon returned no id for network {name}")))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(runtime_error)?;

        for warning in &response.warnings {
            tracing::warn!(name = %spec.name, warning = %warning, "Create container warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(runtime_error)
    }

    async fn wait_for_removal(&self, id: &str) -> Result<ContainerExit, RuntimeError> {
        let options = WaitContainerOptions {
            condition: "removed",
        };
        let mut events = Box::pin(self.docker.wait_container(id, Some(options)));

        match events.next().await {
            Some(item) => exit_from_wait(item),
            None => Err(RuntimeError::Stream(format!(
                "wait stream for {id} ended without an event"
            ))),
        }
    }
}

impl std::fmt::Debug for DockerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerRuntime")
            .field("network_driver", &self.network_driver)
            .finish()
    }
}
