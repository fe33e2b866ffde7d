//! Orchestrator for burn-in lifecycle management
//!
//! The Orchestrator coordinates a complete run:
//! - Pulling the base image and provisioning labeled networks
//! - Spawning the worker pool and the index generator
//! - Graceful stop via a one-shot latch, fail-fast via a child cancellation token
//! - Joining every task and aggregating worker statistics
//!
//! # Example
//!
//! ```ignore
//! use containerburn_core::OrchestratorBuilder;
//!
//! let (mut orchestrator, status_rx) = OrchestratorBuilder::new()
//!     .config(config)
//!     .runtime(runtime)
//!     .build()?;
//!
//! let summary = orchestrator
//!     .run_with_signal_handling(CancellationToken::new(), None)
//!     .await?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats, RunSummary};
pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;
