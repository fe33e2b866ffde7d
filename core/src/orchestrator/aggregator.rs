//! Result aggregation from multiple workers

use std::time::Duration;

use crate::worker::WorkerStats;

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of workers that exited cleanly
    pub total_workers: usize,

    /// Workloads that exited with code 0 and no runtime error
    pub total_completed: usize,

    /// Workloads that exited non-zero or with a runtime error
    pub total_failed_exits: usize,

    /// Workloads whose removal wait failed
    pub total_wait_errors: usize,

    /// Workloads abandoned by cancellation
    pub total_abandoned: usize,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall finished workloads per second
    pub workloads_per_second: f64,
}

impl AggregatedStats {
    /// Workloads that reached a removal event or a wait error
    pub fn total_finished(&self) -> usize {
        self.total_completed + self.total_failed_exits + self.total_wait_errors
    }

    /// Every index the pool handled
    pub fn total_handled(&self) -> usize {
        self.total_finished() + self.total_abandoned
    }

    /// Clean exits as a share of finished workloads (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_finished();
        if total > 0 {
            self.total_completed as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut totals = WorkerStats::new();
    for s in stats {
        totals.merge(s);
    }

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let workloads_per_second = if secs > 0.0 {
        totals.finished() as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        total_completed: totals.completed,
        total_failed_exits: totals.failed_exits,
        total_wait_errors: totals.wait_errors,
        total_abandoned: totals.abandoned,
        total_duration,
        workloads_per_second,
    }
}

/// What `Orchestrator::wait` returns after a clean shutdown
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-worker statistics, in the order workers exited
    pub workers: Vec<WorkerStats>,

    /// Totals across the pool
    pub aggregate: AggregatedStats,

    /// Indices the generator handed off; exactly `0..dispatched`
    pub dispatched: u64,
}
