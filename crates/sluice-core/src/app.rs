//! The application calling convention.
//!
//! Every application the server runs implements [`Application`]: it is
//! called once per scope with a receive channel, a send channel, and an
//! [`Executor`] for blocking work.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::{EventReceiver, EventSender, Executor, Scope, SluiceResult};

/// An application served by Sluice.
pub trait Application: Send + Sync + 'static {
    /// Handles one scope.
    ///
    /// # Arguments
    ///
    /// * `scope` - The request or connection metadata
    /// * `receive` - Source of incoming events for this scope
    /// * `send` - Sink for outgoing events for this scope
    /// * `executor` - Offload primitive for blocking calls
    fn call(
        &self,
        scope: Scope,
        receive: Arc<dyn EventReceiver>,
        send: Arc<dyn EventSender>,
        executor: Arc<dyn Executor>,
    ) -> BoxFuture<'_, SluiceResult<()>>;
}

/// Wraps a native asynchronous application function.
///
/// The function already speaks the event protocol, so calls pass straight
/// through and the executor is not used.
///
/// # Example
///
/// ```rust
/// use sluice_core::{AsyncApp, ReceiveEvent, Scope, SendEvent};
///
/// let app = AsyncApp::new(|scope, receive, send| async move {
///     if let Scope::Lifespan(_) = scope {
///         while let Ok(event) = receive.receive().await {
///             match event {
///                 ReceiveEvent::LifespanStartup => {
///                     send.send(SendEvent::LifespanStartupComplete).await?;
///                 }
///                 ReceiveEvent::LifespanShutdown => {
///                     send.send(SendEvent::LifespanShutdownComplete).await?;
///                     break;
///                 }
///                 _ => {}
///             }
///         }
///     }
///     Ok::<_, sluice_core::Error>(())
/// });
/// # let _ = app;
/// ```
pub struct AsyncApp<F> {
    func: F,
}

impl<F> AsyncApp<F> {
    /// Creates a new async application wrapper.
    #[must_use]
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Scope, Arc<dyn EventReceiver>, Arc<dyn EventSender>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SluiceResult<()>> + Send + 'static,
    {
        Self { func }
    }
}

impl<F> std::fmt::Debug for AsyncApp<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncApp").finish_non_exhaustive()
    }
}

impl<F, Fut> Application for AsyncApp<F>
where
    F: Fn(Scope, Arc<dyn EventReceiver>, Arc<dyn EventSender>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SluiceResult<()>> + Send + 'static,
{
    fn call(
        &self,
        scope: Scope,
        receive: Arc<dyn EventReceiver>,
        send: Arc<dyn EventSender>,
        _executor: Arc<dyn Executor>,
    ) -> BoxFuture<'_, SluiceResult<()>> {
        Box::pin((self.func)(scope, receive, send))
    }
}
