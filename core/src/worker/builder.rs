//! Builder pattern for Worker construction

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channel::IndexReceiver;
use crate::error::{BurnError, BurnResult};
use crate::shutdown::StopListener;

use super::executor::Worker;
use super::lifecycle::LifecycleExecutor;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .executor(executor)
///     .queue(rx)
///     .stop(stop.listener())
///     .cancel(run_token.clone())
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    executor: Option<Arc<LifecycleExecutor>>,
    queue: Option<IndexReceiver>,
    stop: Option<StopListener>,
    cancel: Option<CancellationToken>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            executor: None,
            queue: None,
            stop: None,
            cancel: None,
        }
    }

    /// Set the shared lifecycle executor
    pub fn executor(mut self, executor: Arc<LifecycleExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the receiving half of the work queue
    pub fn queue(mut self, queue: IndexReceiver) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the stop listener
    pub fn stop(mut self, stop: StopListener) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the run cancellation token (defaults to a fresh, unlinked token)
    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BurnResult<Worker> {
        let executor = self
            .executor
            .ok_or(BurnError::missing_config("executor"))?;
        let queue = self.queue.ok_or(BurnError::missing_config("queue"))?;
        let stop = self.stop.ok_or(BurnError::missing_config("stop"))?;
        let cancel = self.cancel.unwrap_or_default();

        Ok(Worker::new(self.id, executor, queue, stop, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::rendezvous;
    use crate::shutdown::StopSignal;

    #[test]
    fn test_builder_missing_executor() {
        let (_tx, rx) = rendezvous();
        let result = WorkerBuilder::new(0)
            .queue(rx)
            .stop(StopSignal::new().listener())
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("executor"));
    }

    #[test]
    fn test_builder_missing_queue() {
        let result = WorkerBuilder::new(0)
            .stop(StopSignal::new().listener())
            .build();

        assert!(matches!(result, Err(BurnError::MissingConfig(_))));
    }

    #[test]
    fn test_builder_missing_stop() {
        let (_tx, rx) = rendezvous();
        let result = WorkerBuilder::new(0).queue(rx).build();

        assert!(result.is_err());
    }
}
