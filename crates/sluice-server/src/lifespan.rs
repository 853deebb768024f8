//! The lifespan handshake.
//!
//! One [`Lifespan`] exists per server. [`Lifespan::handle_lifespan`] runs
//! the application with a `lifespan` scope for the whole life of the
//! server, while the boot sequence calls [`Lifespan::wait_for_startup`]
//! before accepting traffic and [`Lifespan::wait_for_shutdown`] after
//! traffic has drained.
//!
//! Outcomes:
//!
//! - `lifespan.*.complete` releases the matching waiter.
//! - `lifespan.*.failed`, or any non-lifespan event sent by the
//!   application, is recorded as a fault. The fault is fatal: it is returned
//!   from [`Lifespan::handle_lifespan`] and from [`Lifespan::check_fault`]
//!   even if the application swallowed the error it was handed.
//! - Any other error or panic from the application means lifespan is not
//!   supported; the server carries on without it.
//!
//! # Example
//!
//! ```rust,ignore
//! let lifespan = Lifespan::new(app, executor, &config);
//! let task = tokio::spawn({
//!     let lifespan = lifespan.clone();
//!     async move { lifespan.handle_lifespan().await }
//! });
//!
//! lifespan.wait_for_startup().await?;
//! lifespan.check_fault()?;
//! // ... serve ...
//! lifespan.wait_for_shutdown().await?;
//! lifespan.check_fault()?;
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use sluice_core::{
    Application, Error, EventReceiver, EventSender, Executor, LifespanScope, LifespanStage,
    ReceiveEvent, Scope, SendEvent, SluiceResult,
};
use sluice_telemetry::logging::fields;
use sluice_telemetry::metrics::record_lifespan_event;
use tokio::sync::mpsc;

use crate::{CompletionSignal, ServerConfig};

/// A fatal lifespan fault recorded from the send side.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fault {
    Failure {
        stage: LifespanStage,
        message: String,
    },
    UnexpectedMessage(&'static str),
}

impl Fault {
    fn to_error(&self) -> Error {
        match self {
            Self::Failure { stage, message } => Error::lifespan_failure(*stage, message.clone()),
            Self::UnexpectedMessage(type_name) => Error::unexpected_message(*type_name),
        }
    }
}

struct Shared {
    app: Arc<dyn Application>,
    executor: Arc<dyn Executor>,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    queue_tx: mpsc::Sender<ReceiveEvent>,
    queue_rx: tokio::sync::Mutex<mpsc::Receiver<ReceiveEvent>>,
    supported: AtomicBool,
    started: CompletionSignal,
    startup: CompletionSignal,
    shutdown: CompletionSignal,
    finished: CompletionSignal,
    fault: Mutex<Option<Fault>>,
}

impl Shared {
    fn signal(&self, stage: LifespanStage) -> &CompletionSignal {
        match stage {
            LifespanStage::Startup => &self.startup,
            LifespanStage::Shutdown => &self.shutdown,
        }
    }

    fn record_fault(&self, fault: Fault) {
        let mut slot = self.fault.lock();
        if slot.is_none() {
            *slot = Some(fault);
        }
    }

    fn fault(&self) -> Option<Fault> {
        self.fault.lock().clone()
    }
}

/// Releases every waiter when the application task ends, however it ends.
struct ReleaseOnDrop(Arc<Shared>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.startup.set();
        self.0.shutdown.set();
        self.0.finished.set();
    }
}

/// The lifespan state machine.
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Lifespan {
    shared: Arc<Shared>,
}

impl Lifespan {
    /// Creates the state machine for `app`.
    ///
    /// Timeouts and the queue capacity come from `config`.
    #[must_use]
    pub fn new(
        app: Arc<dyn Application>,
        executor: Arc<dyn Executor>,
        config: &ServerConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.max_app_queue_size().max(1));
        Self {
            shared: Arc::new(Shared {
                app,
                executor,
                startup_timeout: config.startup_timeout(),
                shutdown_timeout: config.shutdown_timeout(),
                queue_tx,
                queue_rx: tokio::sync::Mutex::new(queue_rx),
                supported: AtomicBool::new(true),
                started: CompletionSignal::new(),
                startup: CompletionSignal::new(),
                shutdown: CompletionSignal::new(),
                finished: CompletionSignal::new(),
                fault: Mutex::new(None),
            }),
        }
    }

    /// Runs the application with a `lifespan` scope until it returns.
    ///
    /// # Errors
    ///
    /// Returns the recorded fault ([`Error::LifespanFailure`] or
    /// [`Error::UnexpectedMessage`]) if there is one. Every other
    /// application failure is absorbed and marks lifespan unsupported.
    pub async fn handle_lifespan(&self) -> SluiceResult<()> {
        let _release = ReleaseOnDrop(Arc::clone(&self.shared));
        self.shared.started.set();

        let receive: Arc<dyn EventReceiver> = Arc::new(LifespanReceiver {
            shared: Arc::clone(&self.shared),
        });
        let send: Arc<dyn EventSender> = Arc::new(LifespanSender {
            shared: Arc::clone(&self.shared),
        });

        let outcome = AssertUnwindSafe(self.shared.app.call(
            Scope::Lifespan(LifespanScope::default()),
            receive,
            send,
            Arc::clone(&self.shared.executor),
        ))
        .catch_unwind()
        .await;

        if let Some(fault) = self.shared.fault() {
            let error = fault.to_error();
            tracing::error!({ fields::ERROR } = %error, "Lifespan failure");
            return Err(error);
        }

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => self.mark_unsupported(&error.to_string()),
            Err(_) => self.mark_unsupported("application panicked"),
        }
        Ok(())
    }

    fn mark_unsupported(&self, reason: &str) {
        self.shared.supported.store(false, Ordering::SeqCst);

        if !self.shared.startup.is_set() {
            record_lifespan_event(LifespanStage::Startup.as_str(), "unsupported");
            tracing::warn!(
                { fields::ERROR } = reason,
                "Lifespan error, continuing without lifespan support"
            );
        } else if !self.shared.shutdown.is_set() {
            record_lifespan_event(LifespanStage::Shutdown.as_str(), "unsupported");
            tracing::error!(
                { fields::ERROR } = reason,
                "Lifespan error, shutting down without lifespan support"
            );
        } else {
            tracing::error!({ fields::ERROR } = reason, "Lifespan errored after shutdown");
        }
    }

    /// Sends `lifespan.startup` and waits for the application to answer.
    ///
    /// Returns immediately once lifespan is known to be unsupported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LifespanTimeout`] if the startup timeout elapses.
    pub async fn wait_for_startup(&self) -> SluiceResult<()> {
        self.wait_for(LifespanStage::Startup, self.shared.startup_timeout)
            .await
    }

    /// Sends `lifespan.shutdown` and waits for the application to answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LifespanTimeout`] if the shutdown timeout elapses.
    pub async fn wait_for_shutdown(&self) -> SluiceResult<()> {
        self.wait_for(LifespanStage::Shutdown, self.shared.shutdown_timeout)
            .await
    }

    async fn wait_for(&self, stage: LifespanStage, timeout: Duration) -> SluiceResult<()> {
        self.shared.started.wait().await;
        if !self.is_supported() {
            return Ok(());
        }

        // An application that has already returned will never drain the queue.
        tokio::select! {
            sent = self.shared.queue_tx.send(ReceiveEvent::lifespan(stage)) => {
                sent.map_err(|_| Error::channel_closed("lifespan queue closed"))?;
            }
            () = self.shared.finished.wait() => return Ok(()),
        }

        if tokio::time::timeout(timeout, self.shared.signal(stage).wait())
            .await
            .is_err()
        {
            record_lifespan_event(stage.as_str(), "timeout");
            tracing::error!({ fields::STAGE } = %stage, ?timeout, "Lifespan timed out");
            return Err(Error::lifespan_timeout(stage));
        }
        Ok(())
    }

    /// Returns `false` once the application has shown it does not speak
    /// the lifespan protocol.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.shared.supported.load(Ordering::SeqCst)
    }

    /// Returns the recorded fatal fault, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LifespanFailure`] or [`Error::UnexpectedMessage`].
    pub fn check_fault(&self) -> SluiceResult<()> {
        self.shared.fault().map_or(Ok(()), |fault| Err(fault.to_error()))
    }
}

impl std::fmt::Debug for Lifespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifespan")
            .field("supported", &self.is_supported())
            .field("startup", &self.shared.startup.is_set())
            .field("shutdown", &self.shared.shutdown.is_set())
            .field("fault", &self.shared.fault())
            .finish_non_exhaustive()
    }
}

struct LifespanReceiver {
    shared: Arc<Shared>,
}

impl EventReceiver for LifespanReceiver {
    fn receive(&self) -> BoxFuture<'_, SluiceResult<ReceiveEvent>> {
        Box::pin(async move {
            self.shared
                .queue_rx
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| Error::channel_closed("lifespan queue closed"))
        })
    }
}

struct LifespanSender {
    shared: Arc<Shared>,
}

impl LifespanSender {
    fn complete(&self, stage: LifespanStage) {
        record_lifespan_event(stage.as_str(), "complete");
        tracing::info!({ fields::STAGE } = %stage, "Lifespan stage complete");
        self.shared.signal(stage).set();
    }

    fn fail(&self, stage: LifespanStage, message: String) -> Error {
        record_lifespan_event(stage.as_str(), "failed");
        // Record before releasing the waiter so it observes the fault.
        self.shared.record_fault(Fault::Failure {
            stage,
            message: message.clone(),
        });
        self.shared.signal(stage).set();
        Error::lifespan_failure(stage, message)
    }
}

impl EventSender for LifespanSender {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, SluiceResult<()>> {
        let result = match event {
            SendEvent::LifespanStartupComplete => {
                self.complete(LifespanStage::Startup);
                Ok(())
            }
            SendEvent::LifespanShutdownComplete => {
                self.complete(LifespanStage::Shutdown);
                Ok(())
            }
            SendEvent::LifespanStartupFailed { message } => {
                Err(self.fail(LifespanStage::Startup, message))
            }
            SendEvent::LifespanShutdownFailed { message } => {
                Err(self.fail(LifespanStage::Shutdown, message))
            }
            other => {
                let type_name = other.type_name();
                self.shared.record_fault(Fault::UnexpectedMessage(type_name));
                Err(Error::unexpected_message(type_name))
            }
        };
        Box::pin(async move { result })
    }
}
