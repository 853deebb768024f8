//! Executors that move blocking calls off the runtime workers.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use sluice_core::{BlockingTask, Error, Executor, SluiceResult};
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Runs every task on Tokio's blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingExecutor;

impl Executor for BlockingExecutor {
    fn execute(&self, task: BlockingTask) -> BoxFuture<'_, SluiceResult<()>> {
        Box::pin(async move { tokio::task::spawn_blocking(task).await.map_err(join_error) })
    }
}

/// Runs tasks on the blocking pool with at most `workers` in flight.
///
/// Excess tasks wait for a permit before they are handed to a thread, so a
/// burst of slow synchronous requests cannot grow the blocking pool without
/// bound.
///
/// # Example
///
/// ```rust
/// use sluice_core::ExecutorExt;
/// use sluice_server::WorkerPool;
///
/// # tokio_test::block_on(async {
/// let pool = WorkerPool::new(2);
/// assert_eq!(pool.run(|| 6 * 7).await.unwrap(), 42);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool allowing `workers` concurrent tasks (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Returns the configured concurrency.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns how many more tasks could start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: BlockingTask) -> BoxFuture<'_, SluiceResult<()>> {
        Box::pin(async move {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| Error::offload("worker pool closed"))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                task();
            })
            .await
            .map_err(join_error)
        })
    }
}

fn join_error(e: JoinError) -> Error {
    if e.is_cancelled() {
        Error::offload("blocking task was cancelled")
    } else if e.is_panic() {
        Error::offload("blocking task panicked")
    } else {
        Error::offload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::ExecutorExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_blocking_executor_returns_value() {
        let value = BlockingExecutor.run(|| "done").await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_blocking_executor_runs_off_runtime_thread() {
        let caller = std::thread::current().id();
        let worker = BlockingExecutor
            .run(|| std::thread::current().id())
            .await
            .unwrap();
        assert_ne!(caller, worker);
    }

    #[tokio::test]
    async fn test_panic_maps_to_offload_error() {
        let err = BlockingExecutor
            .run(|| -> u8 { panic!("synchronous code failed") })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Offload(_)));
    }

    #[tokio::test]
    async fn test_worker_pool_zero_becomes_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_pool_limits_concurrency() {
        let pool = Arc::new(WorkerPool::new(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }
}
