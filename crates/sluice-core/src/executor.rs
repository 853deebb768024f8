//! The blocking-call offload seam.
//!
//! Synchronous application code must never run on a runtime worker thread.
//! An [`Executor`] moves a blocking closure onto a separate thread and
//! resolves once it has finished; [`ExecutorExt::run`] adds typed results on
//! top of it.

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::{Error, SluiceResult};

/// A boxed blocking closure.
pub type BlockingTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs blocking closures without blocking the caller's scheduler.
pub trait Executor: Send + Sync {
    /// Runs `task` on a separate thread and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Offload`] if the task could not be started or
    /// panicked.
    fn execute(&self, task: BlockingTask) -> BoxFuture<'_, SluiceResult<()>>;
}

/// Typed convenience methods for every [`Executor`].
pub trait ExecutorExt: Executor {
    /// Runs `f` through the executor and returns its result.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_core::fixtures::InlineExecutor;
    /// use sluice_core::ExecutorExt;
    ///
    /// # tokio_test::block_on(async {
    /// let value = InlineExecutor.run(|| 40 + 2).await.unwrap();
    /// assert_eq!(value, 42);
    /// # });
    /// ```
    fn run<F, R>(&self, f: F) -> BoxFuture<'_, SluiceResult<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            self.execute(Box::new(move || {
                // The receiver only disappears if the caller was cancelled.
                let _ = tx.send(f());
            }))
            .await?;
            rx.await
                .map_err(|_| Error::offload("blocking task finished without a result"))
        })
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}
