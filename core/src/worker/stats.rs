//! Worker statistics tracking

use std::time::Instant;

use crate::workload::RunOutcome;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Workloads whose removal event reported a clean exit
    pub completed: usize,

    /// Workloads that exited non-zero or with a runtime error
    pub failed_exits: usize,

    /// Workloads whose removal wait failed
    pub wait_errors: usize,

    /// Workloads abandoned by cancellation
    pub abandoned: usize,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Tally one lifecycle outcome
    pub fn record(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed(exit) if exit.is_success() => self.completed += 1,
            RunOutcome::Completed(_) => self.failed_exits += 1,
            RunOutcome::WaitFailed(_) => self.wait_errors += 1,
            RunOutcome::Abandoned => self.abandoned += 1,
        }
    }

    /// Workloads that reached the removal event or a wait error
    pub fn finished(&self) -> usize {
        self.completed + self.failed_exits + self.wait_errors
    }

    /// Every index this worker handled, abandoned ones included
    pub fn handled(&self) -> usize {
        self.finished() + self.abandoned
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Finished workloads per second
    pub fn workloads_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.finished() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.failed_exits += other.failed_exits;
        self.wait_errors += other.wait_errors;
        self.abandoned += other.abandoned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaitError;
    use crate::traits::{ContainerExit, RuntimeError};

    #[test]
    fn test_worker_stats_defaults() {
        let stats = WorkerStats::default();
        assert_eq!(stats.handled(), 0);
        assert!(stats.started_at.is_none());
        assert!(stats.ended_at.is_none());
        assert_eq!(stats.workloads_per_second(), 0.0);
    }

    #[test]
    fn test_worker_stats_record() {
        let mut stats = WorkerStats::new();
        stats.record(&RunOutcome::Completed(ContainerExit::code(0)));
        stats.record(&RunOutcome::Completed(ContainerExit::code(0)));
        stats.record(&RunOutcome::Completed(ContainerExit::code(1)));
        stats.record(&RunOutcome::WaitFailed(WaitError(RuntimeError::Other("x".into()))));
        stats.record(&RunOutcome::Abandoned);

        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed_exits, 1);
        assert_eq!(stats.wait_errors, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.finished(), 4);
        assert_eq!(stats.handled(), 5);
    }

    #[test]
    fn test_worker_stats_merge() {
        let mut a = WorkerStats {
            completed: 10,
            wait_errors: 1,
            ..Default::default()
        };
        let b = WorkerStats {
            completed: 5,
            failed_exits: 2,
            abandoned: 1,
            ..Default::default()
        };
        a.merge(&b);

        assert_eq!(a.completed, 15);
        assert_eq!(a.failed_exits, 2);
        assert_eq!(a.wait_errors, 1);
        assert_eq!(a.abandoned, 1);
    }

    #[test]
    fn test_worker_stats_start_stop() {
        let mut stats = WorkerStats::new();
        assert!(stats.elapsed().is_none());

        stats.start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        stats.stop();

        let elapsed = stats.elapsed().unwrap();
        assert!(elapsed >= std::time::Duration::from_millis(10));
    }
}
