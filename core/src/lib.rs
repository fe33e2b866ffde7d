//! containerburn-core: container churn burn-in engine
//!
//! This crate drives a sustained stream of short-lived, auto-removing
//! containers through a container runtime, including:
//!
//! - Network provisioning under marker labels
//! - A rendezvous work queue fed by a single index generator
//! - A fixed worker pool running the create -> start -> wait lifecycle
//! - Graceful stop, upstream cancellation and fail-fast shutdown
//! - The runtime abstraction ([`ContainerRuntime`]) the engine talks to

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod generator;
pub mod network;
pub mod orchestrator;
pub mod report;
pub mod shutdown;
pub mod traits;
pub mod worker;
pub mod workload;

#[cfg(test)]
mod mock;

pub use channel::{rendezvous, ChannelConfig, IndexReceiver, IndexSender};
pub use config::{BurnConfig, ConfigError};
pub use error::*;
pub use generator::WorkGenerator;
pub use network::{LabelSelector, NetworkProvisioner, NetworkSet};
pub use orchestrator::{
    aggregate_worker_stats, AggregatedStats, Orchestrator, OrchestratorBuilder, RunSummary,
};
pub use report::StatusEvent;
pub use shutdown::{StopListener, StopSignal};
pub use traits::*;
pub use worker::{LifecycleExecutor, Worker, WorkerBuilder, WorkerStats};
pub use workload::{ContainerSpec, RunOutcome, RunReport, SleepRange, WorkIndex, WorkloadSpec};
