//! Worker module for running workload lifecycles
//!
//! The Worker is the execution unit of a burn-in run, responsible for the
//! loop: **claim index -> create -> start -> wait for removal -> repeat**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Claims the next index from the rendezvous queue, only when idle
//! 2. Derives the workload (name, network, sleep duration)
//! 3. Creates and starts an auto-removing container via the runtime
//! 4. Waits for its removal event and reports it on the status channel
//! 5. Repeats until the queue closes, the run stops, or it is cancelled
//!
//! # Example
//!
//! ```ignore
//! use containerburn_core::worker::{LifecycleExecutor, WorkerBuilder};
//!
//! let executor = Arc::new(LifecycleExecutor::new(runtime, config, networks, status_tx));
//! let worker = WorkerBuilder::new(0)
//!     .executor(executor)
//!     .queue(rx)
//!     .stop(stop.listener())
//!     .cancel(run_token.clone())
//!     .build()?;
//!
//! let stats = worker.run().await?;
//! println!("Completed: {}", stats.completed);
//! ```

mod builder;
mod executor;
mod lifecycle;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use lifecycle::LifecycleExecutor;
pub use stats::WorkerStats;
