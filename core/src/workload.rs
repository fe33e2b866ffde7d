//! Work identity and per-workload specifications

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BurnConfig;
use crate::error::WaitError;
use crate::network::NetworkSet;
use crate::traits::ContainerExit;

/// Identity of one unit of work
///
/// Generated once each, strictly increasing from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkIndex(pub u64);

impl WorkIndex {
    /// The index after this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for WorkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range workload sleep durations are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRange {
    min_secs: u64,
    max_secs: u64,
}

impl SleepRange {
    /// Create a range; bounds are swapped if given in reverse
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    /// Range configured on a [`BurnConfig`]
    pub fn from_config(config: &BurnConfig) -> Self {
        Self::new(config.min_sleep_secs, config.max_sleep_secs)
    }

    /// Draw one duration, uniform over the integers in the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min_secs..=self.max_secs)
    }

    /// Lower bound
    pub fn min_secs(&self) -> u64 {
        self.min_secs
    }

    /// Upper bound
    pub fn max_secs(&self) -> u64 {
        self.max_secs
    }
}

impl Default for SleepRange {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// What one workload will do, derived from its index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Index this workload was derived from
    pub index: WorkIndex,

    /// Container name and hostname, `burn-<index>`
    pub name: String,

    /// Network the workload attaches to
    pub network_id: String,

    /// How long the workload sleeps
    pub duration_secs: u64,
}

impl WorkloadSpec {
    /// Derive the spec for `index`
    ///
    /// Name and network depend only on the index; the duration is drawn
    /// independently for each workload.
    pub fn derive<R: Rng + ?Sized>(
        index: WorkIndex,
        networks: &NetworkSet,
        sleep: &SleepRange,
        rng: &mut R,
    ) -> Self {
        Self {
            index,
            name: workload_name(index),
            network_id: networks.for_index(index).to_string(),
            duration_secs: sleep.sample(rng),
        }
    }

    /// Runtime create request for this workload
    pub fn container_spec(&self, config: &BurnConfig) -> ContainerSpec {
        ContainerSpec {
            name: self.name.clone(),
            hostname: self.name.clone(),
            image: config.image.clone(),
            command: vec!["sleep".to_string(), self.duration_secs.to_string()],
            exposed_port: config.exposed_port.clone(),
            port_host_ip: config.port_host_ip.clone(),
            auto_remove: true,
            network_id: self.network_id.clone(),
        }
    }
}

/// Name of the workload for `index`
pub fn workload_name(index: WorkIndex) -> String {
    format!("burn-{}", index.0)
}

/// Create request handed to the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,

    /// Container hostname
    pub hostname: String,

    /// Image reference
    pub image: String,

    /// Command and arguments
    pub command: Vec<String>,

    /// Declared port, `<port>/<proto>`
    pub exposed_port: String,

    /// Host IP the declared port is bound to; host port left to the runtime
    pub port_host_ip: String,

    /// Runtime deletes the container once it exits
    pub auto_remove: bool,

    /// Single network endpoint
    pub network_id: String,
}

/// How one lifecycle ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Removal event arrived
    Completed(ContainerExit),

    /// The wait itself failed; affects this workload only
    WaitFailed(WaitError),

    /// Run was cancelled before the lifecycle finished
    Abandoned,
}

impl RunOutcome {
    /// Whether the workload exited cleanly
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(exit) if exit.is_success())
    }
}

/// Result of one lifecycle, as streamed to the operator
#[derive(Debug)]
pub struct RunReport {
    /// The workload that ran
    pub spec: WorkloadSpec,

    /// How it ended
    pub outcome: RunOutcome,

    /// When the lifecycle ended
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
