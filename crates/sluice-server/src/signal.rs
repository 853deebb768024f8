//! One-shot completion signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A one-shot flag that tasks can wait on.
///
/// Once set it stays set; every current and future waiter is released.
/// Clones share state.
///
/// # Example
///
/// ```rust
/// use sluice_server::CompletionSignal;
///
/// # tokio_test::block_on(async {
/// let signal = CompletionSignal::new();
/// let waiter = signal.clone();
///
/// signal.set();
/// waiter.wait().await;
/// assert!(waiter.is_set());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    set: AtomicBool,
    notify: Notify,
}

impl CompletionSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal and wakes every waiter. Idempotent.
    pub fn set(&self) {
        if !self.inner.set.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once the signal has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::SeqCst)
    }

    /// Waits until the signal is set.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent set() is not missed.
            notified.as_mut().enable();

            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
