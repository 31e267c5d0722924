//! Run-scoped cancellation signal shared by every task of a scheduling run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SignalState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation flag. Cloning shares the same underlying signal.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<SignalState>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel() is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Fire the signal once `deadline` elapses. Requires a Tokio runtime.
    pub fn cancel_after(&self, deadline: Duration) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            signal.cancel();
        })
    }
}
