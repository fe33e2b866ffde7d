//! Mapping between containerburn types and Docker Engine API types

use std::collections::{BTreeMap, HashMap};

use bollard::container::{Config, NetworkingConfig};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerWaitResponse, CreateImageInfo, EndpointSettings, HostConfig, PortBinding};

use containerburn_core::{ContainerExit, ContainerSpec, LabelSelector, PullProgress, RuntimeError};

/// Create-container body for a workload
pub(crate) fn container_config(spec: &ContainerSpec) -> Config<String> {
    let exposed_ports = HashMap::from([(spec.exposed_port.clone(), HashMap::new())]);

    // Host port left empty so the daemon picks a free one.
    let port_bindings = HashMap::from([(
        spec.exposed_port.clone(),
        Some(vec![PortBinding {
            host_ip: Some(spec.port_host_ip.clone()),
            host_port: None,
        }]),
    )]);

    let endpoints = HashMap::from([(spec.network_id.clone(), EndpointSettings::default())]);

    Config {
        hostname: Some(spec.hostname.clone()),
        image: Some(spec.image.clone()),
        cmd: Some(spec.command.clone()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            auto_remove: Some(spec.auto_remove),
            port_bindings: Some(port_bindings),
            ..Default::default()
        }),
        networking_config: Some(NetworkingConfig {
            endpoints_config: endpoints,
        }),
        ..Default::default()
    }
}

/// Prune filters for a label selector
pub(crate) fn label_filters(selector: &LabelSelector) -> HashMap<String, Vec<String>> {
    HashMap::from([("label".to_string(), selector.filters().to_vec())])
}

/// Label map in the shape the network API takes
pub(crate) fn network_labels(labels: &BTreeMap<String, String>) -> HashMap<String, String> {
    labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Pull progress item
pub(crate) fn pull_progress(info: CreateImageInfo) -> PullProgress {
    PullProgress {
        id: info.id,
        status: info.status,
        progress: info.progress,
    }
}

/// First item of a `condition=removed` wait stream
///
/// The daemon reports a non-zero exit as an error item; that is still an
/// exit, not a failed wait.
pub(crate) fn exit_from_wait(
    item: Result<ContainerWaitResponse, DockerError>,
) -> Result<ContainerExit, RuntimeError> {
    match item {
        Ok(response) => Ok(ContainerExit {
            exit_code: response.status_code,
            runtime_error: response
                .error
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty()),
        }),
        Err(DockerError::DockerContainerWaitError { error, code }) => Ok(ContainerExit {
            exit_code: code,
            runtime_error: Some(error).filter(|e| !e.is_empty()),
        }),
        Err(e) => Err(runtime_error(e)),
    }
}

/// Convert a bollard error
pub(crate) fn runtime_error(err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Api {
            status: status_code,
            message,
        },
        DockerError::DockerStreamError { error } => RuntimeError::Stream(error),
        other => RuntimeError::Other(other.to_string()),
    }
}

/// Id from a create response, whichever shape the daemon version returns
pub(crate) fn into_id(id: impl Into<Option<String>>) -> Option<String> {
    id.into().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::ContainerWaitExitError;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "burn-4".into(),
            hostname: "burn-4".into(),
            image: "docker.io/alpine:latest".into(),
            command: vec!["sleep".into(), "3".into()],
            exposed_port: "8080/tcp".into(),
            port_host_ip: "127.0.0.1".into(),
            auto_remove: true,
            network_id: "net-b".into(),
        }
    }

    #[test]
    fn test_container_config() {
        let config = container_config(&spec());

        assert_eq!(config.hostname.as_deref(), Some("burn-4"));
        assert_eq!(config.image.as_deref(), Some("docker.io/alpine:latest"));
        assert_eq!(config.cmd, Some(vec!["sleep".to_string(), "3".to_string()]));
        assert!(config.exposed_ports.unwrap().contains_key("8080/tcp"));

        let host = config.host_config.unwrap();
        assert_eq!(host.auto_remove, Some(true));
        let bindings = host.port_bindings.unwrap();
        let binding = &bindings["8080/tcp"].as_ref().unwrap()[0];
        assert_eq!(binding.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(binding.host_port, None);

        let endpoints = config.networking_config.unwrap().endpoints_config;
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints.contains_key("net-b"));
    }

    #[test]
    fn test_label_filters() {
        let labels = BTreeMap::from([("containerburn".to_string(), "true".to_string())]);
        let filters = label_filters(&LabelSelector::from_labels(&labels));
        assert_eq!(filters["label"], vec!["containerburn=true".to_string()]);
    }

    #[test]
    fn test_wait_clean_exit() {
        let exit = exit_from_wait(Ok(ContainerWaitResponse {
            status_code: 0,
            error: None,
        }))
        .unwrap();
        assert!(exit.is_success());
    }

    #[test]
    fn test_wait_exit_with_runtime_error() {
        let exit = exit_from_wait(Ok(ContainerWaitResponse {
            status_code: 0,
            error: Some(ContainerWaitExitError {
                message: Some("oom".into()),
            }),
        }))
        .unwrap();
        assert_eq!(exit.runtime_error.as_deref(), Some("oom"));
        assert!(!exit.is_success());
    }

    #[test]
    fn test_nonzero_exit_is_not_a_wait_error() {
        let exit = exit_from_wait(Err(DockerError::DockerContainerWaitError {
            error: String::new(),
            code: 137,
        }))
        .unwrap();
        assert_eq!(exit, ContainerExit::code(137));
    }

    #[test]
    fn test_server_error_fails_wait() {
        let err = exit_from_wait(Err(DockerError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".into(),
        }))
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Api { status: 404, .. }));
    }

    #[test]
    fn test_into_id() {
        assert_eq!(into_id("abc".to_string()), Some("abc".to_string()));
        assert_eq!(into_id(Some(String::new())), None);
        assert_eq!(into_id(None::<String>), None);
    }
}
