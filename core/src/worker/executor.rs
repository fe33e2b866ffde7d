//! Worker execution loop

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channel::IndexReceiver;
use crate::error::BurnResult;
use crate::shutdown::StopListener;
use crate::workload::WorkIndex;

use super::lifecycle::LifecycleExecutor;
use super::stats::WorkerStats;

/// Worker runs workloads in a loop: claim index -> lifecycle -> repeat
///
/// Workers are tokio tasks managed by the Orchestrator. They share the
/// lifecycle executor via Arc and pull indices from the rendezvous queue,
/// so a worker only takes an index when it is idle.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Lifecycle executor (shared across workers via Arc)
    executor: Arc<LifecycleExecutor>,

    /// Receiving half of the work queue
    queue: IndexReceiver,

    /// Graceful stop: finish the current workload, take no new one
    stop: StopListener,

    /// Run-wide cancellation, also fired by this worker on a fatal error
    cancel: CancellationToken,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        executor: Arc<LifecycleExecutor>,
        queue: IndexReceiver,
        stop: StopListener,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            executor,
            queue,
            stop,
            cancel,
        }
    }

    /// Run the worker loop
    ///
    /// Returns WorkerStats once the queue closes, the run stops, or the run
    /// is cancelled. A create/start failure cancels the whole run and is
    /// returned as the error.
    pub async fn run(self) -> BurnResult<WorkerStats> {
        let Self {
            id,
            executor,
            queue,
            mut stop,
            cancel,
        } = self;

        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(worker_id = id, "Worker started");

        loop {
            if cancel.is_cancelled() || stop.is_stopped() {
                break;
            }

            let mut claim = queue.claim();
            let index: WorkIndex = tokio::select! {
                biased;

                claimed = &mut claim => match claimed {
                    Some(index) => index,
                    None => {
                        tracing::debug!(worker_id = id, "Work queue closed");
                        break;
                    }
                },

                // An index may land in the claim while we are being told to
                // quit. It has already been counted as dispatched, so run it.
                _ = cancel.cancelled() => match claim.withdraw() {
                    Some(index) => index,
                    None => break,
                },

                _ = stop.stopped() => match claim.withdraw() {
                    Some(index) => index,
                    None => break,
                },
            };

            match executor.execute(&cancel, index).await {
                Ok(report) => stats.record(&report.outcome),
                Err(e) => {
                    tracing::error!(
                        worker_id = id,
                        %index,
                        error = %e,
                        "Fatal workload error, cancelling run"
                    );
                    cancel.cancel();
                    return Err(e);
                }
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = id,
            completed = stats.completed,
            failed_exits = stats.failed_exits,
            wait_errors = stats.wait_errors,
            abandoned = stats.abandoned,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("executor", &self.executor)
            .field("stopped", &self.stop.is_stopped())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
