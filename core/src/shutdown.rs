//! One-shot stop signal shared by the generator and every worker
//!
//! The signal is a latch: it moves from open to stopped once and stays
//! there. Triggering it again is a no-op, so a second Ctrl+C or a stray
//! `stop()` call cannot misbehave.

use std::sync::Arc;

use tokio::sync::watch;

/// Idempotent stop latch
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    /// Create an open signal
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the latch
    ///
    /// Returns `true` for the call that performed the transition and
    /// `false` for every later call.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    /// Whether the latch has been closed
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// New listener; sees the current state even if subscribed late
    pub fn listener(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`StopSignal`]
#[derive(Debug, Clone)]
pub struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopListener {
    /// Non-blocking check
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is triggered
    ///
    /// Also resolves if every [`StopSignal`] handle was dropped, since
    /// nobody is left to keep the run going.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
