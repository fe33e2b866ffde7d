//! Work index generator

use tokio_util::sync::CancellationToken;

use crate::channel::IndexSender;
use crate::shutdown::StopListener;
use crate::workload::WorkIndex;

/// Produces 0, 1, 2, ... into the rendezvous queue until told to stop
#[derive(Debug)]
pub struct WorkGenerator {
    queue: IndexSender,
    stop: StopListener,
    cancel: CancellationToken,
}

impl WorkGenerator {
    /// Create a generator owning the sending half of the queue
    pub fn new(queue: IndexSender, stop: StopListener, cancel: CancellationToken) -> Self {
        Self {
            queue,
            stop,
            cancel,
        }
    }

    /// Run until stopped, cancelled, or every worker is gone
    ///
    /// Returns how many indices were handed off; those are exactly
    /// `0..count`. The queue closes when this returns.
    pub async fn run(self) -> u64 {
        let Self {
            mut queue,
            mut stop,
            cancel,
        } = self;
        let mut next = WorkIndex(0);

        loop {
            // Cheap check first so a stopping run never contends for a worker.
            if cancel.is_cancelled() || stop.is_stopped() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = stop.stopped() => break,
                sent = queue.send(next) => match sent {
                    Ok(()) => next = next.next(),
                    Err(err) => {
                        tracing::debug!(error = %err, "No workers left, generator stopping");
                        break;
                    }
                },
            }
        }

        drop(queue);
        tracing::debug!(dispatched = next.0, "Generator finished");
        next.0
    }
}
