//! Container runtime trait
//!
//! The trait lives in core so the engine can be driven by the Docker
//! implementation in `containerburn-runtime` or by an in-process mock in
//! tests.

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::network::LabelSelector;
use crate::workload::ContainerSpec;

/// Boxed stream of image pull progress items
pub type PullStream<'a> = Pin<Box<dyn Stream<Item = Result<PullProgress, RuntimeError>> + Send + 'a>>;

// ============================================================================
// Container Runtime Trait
// ============================================================================

/// Operations the driver needs from a container runtime
///
/// Implementations must be safe for concurrent use: a single instance is
/// shared by every worker through an `Arc`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime identifier (e.g., "docker")
    fn runtime_name(&self) -> &str;

    /// Pull an image, yielding progress items until the pull finishes
    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a>;

    /// Remove unused networks matching the selector, returning how many went away
    async fn prune_networks(&self, selector: &LabelSelector) -> Result<usize, RuntimeError>;

    /// Create a network carrying the given labels, returning its id
    async fn create_network(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<String, RuntimeError>;

    /// Create a container, returning its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Block until the runtime reports the container as removed
    ///
    /// Resolves exactly once per container.
    async fn wait_for_removal(&self, id: &str) -> Result<ContainerExit, RuntimeError>;
}

/// Final state reported with the removal event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerExit {
    /// Process exit status
    pub exit_code: i64,

    /// Error the runtime attached to the exit, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<String>,
}

impl ContainerExit {
    /// Exit without a runtime error
    pub fn code(exit_code: i64) -> Self {
        Self {
            exit_code,
            runtime_error: None,
        }
    }

    /// Whether the workload exited cleanly
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.runtime_error.is_none()
    }
}

/// One progress item from an image pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullProgress {
    /// Layer or image id the item refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Status text (e.g., "Downloading", "Pull complete")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Progress bar text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

impl fmt::Display for PullProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.id, &self.status, &self.progress]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Runtime-level errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Could not reach the runtime
    #[error("connection error: {0}")]
    Connection(String),

    /// Runtime answered with an error status
    #[error("runtime API error: {status} - {message}")]
    Api {
        /// HTTP-like status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Event or progress stream failed or ended early
    #[error("stream error: {0}")]
    Stream(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}
