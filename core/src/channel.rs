//! Work index hand-off between the generator and the worker pool
//!
//! The queue has no buffer. A receiver registers a claim slot, and the
//! sender fills exactly one waiting claim per index. An index therefore
//! only leaves the generator at the moment a worker takes it: nothing can
//! sit in a buffer when the run shuts down.
//!
//! Dropping the [`IndexSender`] closes the queue. Every outstanding and
//! future claim then resolves to `None`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::workload::WorkIndex;

type Slot = oneshot::Sender<WorkIndex>;

/// Channel sizing for orchestrator -> caller communication
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Status channel buffer size (executor -> status consumer)
    pub status_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            status_buffer: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom status buffer size
    pub fn with_status_buffer(mut self, size: usize) -> Self {
        self.status_buffer = size.max(1);
        self
    }
}

/// Create a zero-capacity index queue
pub fn rendezvous() -> (IndexSender, IndexReceiver) {
    let (slots_tx, slots_rx) = mpsc::unbounded_channel();
    (
        IndexSender { slots: slots_rx },
        IndexReceiver { slots: slots_tx },
    )
}

/// Producing half; owned by the generator alone
#[derive(Debug)]
pub struct IndexSender {
    slots: mpsc::UnboundedReceiver<Slot>,
}

/// Every receiver has gone away; the index was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("all receivers dropped; index {0} was not delivered")]
pub struct SendError(pub WorkIndex);

impl IndexSender {
    /// Hand `index` to exactly one waiting receiver
    ///
    /// Cancel safe: if the future is dropped before it resolves, the index
    /// was not delivered to anyone.
    pub async fn send(&mut self, index: WorkIndex) -> Result<(), SendError> {
        let mut index = index;
        loop {
            let Some(slot) = self.slots.recv().await else {
                return Err(SendError(index));
            };
            // A worker that withdrew its claim hands the index straight back.
            match slot.send(index) {
                Ok(()) => return Ok(()),
                Err(returned) => index = returned,
            }
        }
    }
}

/// Consuming half; cloned once per worker
#[derive(Debug, Clone)]
pub struct IndexReceiver {
    slots: mpsc::UnboundedSender<Slot>,
}

impl IndexReceiver {
    /// Register interest in the next index
    pub fn claim(&self) -> Claim {
        let (slot, rx) = oneshot::channel();
        // On a closed queue the slot is dropped here and the claim resolves to None.
        let _ = self.slots.send(slot);
        Claim { rx }
    }

    /// Wait for the next index; `None` once the queue is closed
    pub async fn recv(&self) -> Option<WorkIndex> {
        self.claim().await
    }
}

/// A pending claim on the next index
///
/// Resolves to `Some(index)` when the sender fills it, or `None` when the
/// queue is closed.
#[derive(Debug)]
pub struct Claim {
    rx: oneshot::Receiver<WorkIndex>,
}

impl Claim {
    /// Give up the claim
    ///
    /// Returns the index if the sender filled the claim before it could be
    /// withdrawn. The caller owns that index and must process it.
    pub fn withdraw(mut self) -> Option<WorkIndex> {
        self.rx.close();
        self.rx.try_recv().ok()
    }
}

impl Future for Claim {
    type Output = Option<WorkIndex>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
