//! Run configuration types

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Image every workload runs
pub const DEFAULT_IMAGE: &str = "docker.io/alpine:latest";

/// Prefix for network names and value of the marker label key
pub const DEFAULT_NETWORK_PREFIX: &str = "containerburn";

/// Burn run configuration
///
/// Built once at start-up and handed to every collaborator that needs it.
/// Nothing mutates it after the orchestrator is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnConfig {
    /// Image reference used for every workload
    pub image: String,

    /// Number of isolated networks to provision
    pub network_count: usize,

    /// Network names are `<prefix>-<n>`
    pub network_prefix: String,

    /// Network driver passed to the runtime
    pub network_driver: String,

    /// Marker labels put on every network; also the prune selector
    pub labels: BTreeMap<String, String>,

    /// Explicit worker count; overrides the multiplier when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Workers per unit of available parallelism
    pub worker_multiplier: usize,

    /// Shortest workload sleep, in seconds (inclusive)
    pub min_sleep_secs: u64,

    /// Longest workload sleep, in seconds (inclusive)
    pub max_sleep_secs: u64,

    /// Port declared on each workload; nothing listens on it
    pub exposed_port: String,

    /// Host IP the exposed port is bound to
    pub port_host_ip: String,
}

impl Default for BurnConfig {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(DEFAULT_NETWORK_PREFIX.to_string(), "true".to_string());

        Self {
            image: DEFAULT_IMAGE.to_string(),
            network_count: 3,
            network_prefix: DEFAULT_NETWORK_PREFIX.to_string(),
            network_driver: "bridge".to_string(),
            labels,
            workers: None,
            worker_multiplier: 3,
            min_sleep_secs: 1,
            max_sleep_secs: 10,
            exposed_port: "8080/tcp".to_string(),
            port_host_ip: "127.0.0.1".to_string(),
        }
    }
}

impl BurnConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Set an explicit worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the number of networks
    pub fn with_network_count(mut self, count: usize) -> Self {
        self.network_count = count;
        self
    }

    /// Set the sleep bounds
    pub fn with_sleep_range(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.min_sleep_secs = min_secs;
        self.max_sleep_secs = max_secs;
        self
    }

    /// Pool size: the explicit count, or multiplier x available parallelism
    ///
    /// Workloads spend nearly all their time waiting on the runtime, so the
    /// pool is deliberately larger than the core count.
    pub fn pool_size(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            cores * self.worker_multiplier
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::Invalid("image must not be empty".into()));
        }

        if self.network_count == 0 {
            return Err(ConfigError::Invalid(
                "network count must be at least 1".into(),
            ));
        }

        if self.network_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "network prefix must not be empty".into(),
            ));
        }

        // An empty selector would prune every unused network on the host.
        if self.labels.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one marker label is required".into(),
            ));
        }

        if self.labels.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("label keys must not be empty".into()));
        }

        match self.workers {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "worker count must be at least 1".into(),
                ))
            }
            None if self.worker_multiplier == 0 => {
                return Err(ConfigError::Invalid(
                    "worker multiplier must be at least 1".into(),
                ))
            }
            _ => {}
        }

        if self.min_sleep_secs == 0 {
            return Err(ConfigError::Invalid(
                "minimum sleep must be at least 1 second".into(),
            ));
        }

        if self.min_sleep_secs > self.max_sleep_secs {
            return Err(ConfigError::Invalid(format!(
                "minimum sleep ({}s) exceeds maximum sleep ({}s)",
                self.min_sleep_secs, self.max_sleep_secs
            )));
        }

        match self.exposed_port.split_once('/') {
            Some((port, proto)) if port.parse::<u16>().is_ok() && !proto.is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "exposed port must look like <port>/<proto>, got {:?}",
                    self.exposed_port
                )))
            }
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
