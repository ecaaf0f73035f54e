//! Operator signals for a running batch.
//!
//! Control never writes batch status itself; it only records what the
//! operator asked for. The orchestrator task reads the signals between
//! items and owns every status transition.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlSignal {
    pub paused: bool,
    pub cancelled: bool,
}

pub struct BatchControl {
    tx: watch::Sender<ControlSignal>,
    /// Fired on cancel; interrupts the running item.
    cancel: CancellationToken,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ControlSignal::default());
        Self {
            tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop dequeuing once the current item finishes.
    pub fn pause(&self) {
        self.tx.send_modify(|s| s.paused = true);
    }

    pub fn resume(&self) {
        self.tx.send_modify(|s| s.paused = false);
    }

    /// Stop the batch and interrupt the running item.
    pub fn cancel(&self) {
        self.tx.send_modify(|s| s.cancelled = true);
        self.cancel.cancel();
    }

    pub fn signal(&self) -> ControlSignal {
        *self.tx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.signal().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal().cancelled
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait until the batch is resumed or cancelled. Returns `false` if it
    /// was cancelled.
    pub async fn wait_until_resumed(&self) -> bool {
        let mut rx = self.tx.subscribe();
        let resumed = match rx.wait_for(|s| !s.paused || s.cancelled).await {
            Ok(signal) => !signal.cancelled,
            Err(_) => false,
        };
        resumed
    }
}
