//! Bridges synchronous applications onto the event protocol.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sluice_core::fixtures::{RecordingSender, ScriptedReceiver};
//! use sluice_core::{Application, HttpScope, SendEvent};
//! use sluice_server::{response_iter, BlockingExecutor, Environ, StartResponse, SyncAdapter, SyncFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = SyncFn::new(|_: &mut Environ, start: &mut StartResponse| {
//!     start.start("200 OK", [("X-Test", "1")])?;
//!     Ok(response_iter(["hi"]))
//! });
//! let adapter = SyncAdapter::new(app, 1024);
//!
//! let send = Arc::new(RecordingSender::new());
//! adapter
//!     .call(
//!         HttpScope::new("GET", "/").into(),
//!         Arc::new(ScriptedReceiver::body("")),
//!         send.clone(),
//!         Arc::new(BlockingExecutor),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(send.events()[1], SendEvent::response_body("hi"));
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use sluice_core::{
    Application, Error, EventReceiver, EventSender, Executor, ExecutorExt, HttpScope, Scope,
    SendEvent, SluiceResult,
};
use sluice_telemetry::logging::fields;
use sluice_telemetry::metrics::{record_rejection, record_response, InFlightGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::{build_environ, read_body, run_sync_app, SyncApplication, SyncResponse};

/// Serves a [`SyncApplication`] as an [`Application`].
///
/// - `http`: buffers the body, builds the environ, calls the application
///   once through the executor and sends exactly one
///   `http.response.start` followed by one `http.response.body`.
/// - `websocket`: refused with a normal-closure `websocket.close`.
/// - `lifespan`: nothing to do.
/// - anything else: [`Error::UnknownScopeType`].
pub struct SyncAdapter<A> {
    app: Arc<A>,
    max_body_size: usize,
}

impl<A: SyncApplication> SyncAdapter<A> {
    /// Wraps `app`, rejecting request bodies larger than `max_body_size`.
    #[must_use]
    pub fn new(app: A, max_body_size: usize) -> Self {
        Self {
            app: Arc::new(app),
            max_body_size,
        }
    }

    /// Returns the body size limit.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    async fn handle_http(
        &self,
        scope: HttpScope,
        receive: Arc<dyn EventReceiver>,
        send: Arc<dyn EventSender>,
        executor: Arc<dyn Executor>,
    ) -> SluiceResult<()> {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let response = self.respond(scope, receive.as_ref(), executor.as_ref()).await?;
        let status = response.status.as_u16();

        send.send(SendEvent::response_start(status, response.headers))
            .await?;
        send.send(SendEvent::response_body(response.body)).await?;

        record_response(status, started.elapsed());
        tracing::debug!({ fields::HTTP_STATUS } = status, "response sent");
        Ok(())
    }

    async fn respond(
        &self,
        scope: HttpScope,
        receive: &dyn EventReceiver,
        executor: &dyn Executor,
    ) -> SluiceResult<SyncResponse> {
        let body = match read_body(receive, self.max_body_size).await {
            Ok(body) => body,
            Err(e) => return reject(e, "payload_too_large"),
        };

        let environ = match build_environ(&scope, body) {
            Ok(environ) => environ,
            Err(e) => return reject(e, "path_mismatch"),
        };

        let app = Arc::clone(&self.app);
        executor
            .run(move || run_sync_app(&*app, environ))
            .await?
    }
}

/// Answers precondition failures locally; every other error propagates.
fn reject(error: Error, reason: &'static str) -> SluiceResult<SyncResponse> {
    match error.precondition_status() {
        Some(status) => {
            tracing::warn!(
                { fields::HTTP_STATUS } = status.as_u16(),
                { fields::ERROR } = %error,
                "request rejected before calling application"
            );
            record_rejection(reason);
            Ok(SyncResponse::empty(status))
        }
        None => Err(error),
    }
}

impl<A> std::fmt::Debug for SyncAdapter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl<A: SyncApplication> Application for SyncAdapter<A> {
    fn call(
        &self,
        scope: Scope,
        receive: Arc<dyn EventReceiver>,
        send: Arc<dyn EventSender>,
        executor: Arc<dyn Executor>,
    ) -> BoxFuture<'_, SluiceResult<()>> {
        Box::pin(async move {
            match scope {
                Scope::Http(http) => {
                    let span = tracing::info_span!(
                        "sync_request",
                        { fields::REQUEST_ID } = %Uuid::now_v7(),
                        { fields::HTTP_METHOD } = %http.method,
                        { fields::HTTP_PATH } = %http.path,
                    );
                    self.handle_http(http, receive, send, executor)
                        .instrument(span)
                        .await
                }
                Scope::Websocket(_) => send.send(SendEvent::websocket_close()).await,
                Scope::Lifespan(_) => Ok(()),
                other => Err(Error::unknown_scope_type(other.type_name())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{response_iter, Environ, StartResponse, SyncFn};
    use sluice_core::fixtures::{InlineExecutor, RecordingSender, ScriptedReceiver};
    use sluice_core::{LifespanScope, WebsocketScope};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_app() -> SyncAdapter<impl SyncApplication> {
        SyncAdapter::new(
            SyncFn::new(|environ: &mut Environ, start: &mut StartResponse| {
                start.start("200 OK", [("Content-Type", "application/octet-stream")])?;
                let body = environ.input.get_ref().clone();
                Ok(response_iter([body]))
            }),
            8,
        )
    }

    async fn call(
        adapter: &SyncAdapter<impl SyncApplication>,
        scope: Scope,
        receive: ScriptedReceiver,
    ) -> (SluiceResult<()>, Vec<SendEvent>) {
        let send = Arc::new(RecordingSender::new());
        let result = adapter
            .call(scope, Arc::new(receive), send.clone(), Arc::new(InlineExecutor))
            .await;
        (result, send.events())
    }

    #[tokio::test]
    async fn test_echo_body() {
        let (result, events) = call(
            &echo_app(),
            HttpScope::new("POST", "/").into(),
            ScriptedReceiver::chunks(["ab", "cd"]),
        )
        .await;

        result.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SendEvent::response_body("abcd"));
    }

    #[tokio::test]
    async fn test_lifespan_is_noop() {
        let (result, events) = call(
            &echo_app(),
            LifespanScope::default().into(),
            ScriptedReceiver::empty(),
        )
        .await;

        result.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_websocket_is_closed() {
        let (result, events) = call(
            &echo_app(),
            WebsocketScope::new("/ws").into(),
            ScriptedReceiver::empty(),
        )
        .await;

        result.unwrap();
        assert_eq!(events, vec![SendEvent::websocket_close()]);
    }

    #[tokio::test]
    async fn test_application_error_sends_nothing() {
        let adapter = SyncAdapter::new(
            SyncFn::new(|_: &mut Environ, _: &mut StartResponse| {
                Err(Error::application("database unavailable"))
            }),
            1024,
        );

        let (result, events) = call(
            &adapter,
            HttpScope::new("GET", "/").into(),
            ScriptedReceiver::body(""),
        )
        .await;

        assert!(matches!(result, Err(Error::Application { .. })));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_oversize_body_skips_application() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let adapter = SyncAdapter::new(
            SyncFn::new(move |_: &mut Environ, start: &mut StartResponse| {
                counter.fetch_add(1, Ordering::SeqCst);
                start.start("200 OK", Vec::<(&str, &str)>::new())?;
                Ok(response_iter(Vec::<bytes::Bytes>::new()))
            }),
            4,
        );

        let (result, events) = call(
            &adapter,
            HttpScope::new("POST", "/").into(),
            ScriptedReceiver::chunks(["abc", "de", "f"]),
        )
        .await;

        result.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            events,
            vec![
                SendEvent::response_start(400, Vec::new()),
                SendEvent::response_body(""),
            ]
        );
    }
}
