//! Error types for containerburn-core
//!
//! Two categories are kept apart on purpose:
//!
//! - [`BurnError`] is fatal. It ends the whole run and is propagated as a
//!   value up to the single top-level handler in the binary.
//! - [`WaitError`] belongs to one workload. It is reported on the status
//!   stream and the worker moves on to the next index.

use thiserror::Error;

use crate::traits::RuntimeError;

/// Fatal error: the run cannot continue
#[derive(Error, Debug)]
pub enum BurnError {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A required builder field was not supplied
    #[error("missing required field: {0}")]
    MissingConfig(&'static str),

    /// Connecting to the container runtime failed
    #[error("failed to connect to container runtime: {0}")]
    Connect(#[source] RuntimeError),

    /// Retrieving the base image failed
    #[error("failed to pull image {image}: {source}")]
    PullImage {
        /// Image reference that was requested
        image: String,
        /// Underlying runtime error
        #[source]
        source: RuntimeError,
    },

    /// Removing leftover labeled networks failed
    #[error("failed to prune networks: {0}")]
    PruneNetworks(#[source] RuntimeError),

    /// Creating a network failed
    #[error("failed to create network {name}: {source}")]
    CreateNetwork {
        /// Network name
        name: String,
        /// Underlying runtime error
        #[source]
        source: RuntimeError,
    },

    /// Creating a workload container failed
    #[error("failed to create container {name}: {source}")]
    CreateContainer {
        /// Workload name
        name: String,
        /// Underlying runtime error
        #[source]
        source: RuntimeError,
    },

    /// Starting a workload container failed
    #[error("failed to start container {name}: {source}")]
    StartContainer {
        /// Workload name
        name: String,
        /// Underlying runtime error
        #[source]
        source: RuntimeError,
    },

    /// Orchestrator used out of order (start twice, wait before start)
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// Cancelled before the run was set up
    #[error("run cancelled during setup")]
    Cancelled,

    /// A spawned task panicked or was aborted
    #[error("task failed: {0}")]
    Task(String),
}

impl BurnError {
    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Missing builder field
    pub fn missing_config(field: &'static str) -> Self {
        Self::MissingConfig(field)
    }

    /// Orchestration misuse
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration(message.into())
    }

    /// Failed task
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task(message.into())
    }
}

/// Per-workload error raised while waiting for the removal event
#[derive(Error, Debug)]
#[error("{0}")]
pub struct WaitError(#[from] pub RuntimeError);

/// Result type alias
pub type BurnResult<T> = std::result::Result<T, BurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_names_field() {
        let err = BurnError::missing_config("runtime");
        assert!(err.to_string().contains("runtime"));
    }

    #[test]
    fn test_create_container_message() {
        let err = BurnError::CreateContainer {
            name: "burn-3".into(),
            source: RuntimeError::Api {
                status: 500,
                message: "boom".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("burn-3"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_wait_error_is_transparent() {
        let err = WaitError::from(RuntimeError::Stream("event lost".into()));
        assert_eq!(err.to_string(), "stream error: event lost");
    }
}
