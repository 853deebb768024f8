//! HTTP server loop.
//!
//! Boot order:
//!
//! 1. Bind the listener
//! 2. Run the application's lifespan scope and wait for startup
//! 3. Accept HTTP/1.1 connections, one application call per request
//! 4. On shutdown, drain connections, then run lifespan shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_server::{Server, ServerConfig, SyncAdapter, SyncFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().bind("0.0.0.0:8000").build();
//!     let app = SyncAdapter::new(SyncFn::new(handler), config.max_body_size());
//!
//!     Server::new(config, app).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use sluice_core::{Application, EventSender, Executor};
use sluice_telemetry::logging::fields;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::bridge::{http_scope, internal_error, BodyReceiver, HttpResponse, ResponseCollector};
use crate::config::ServerConfig;
use crate::executor::WorkerPool;
use crate::lifespan::Lifespan;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The application failed fatally, e.g. during lifespan startup.
    #[error(transparent)]
    Core(#[from] sluice_core::Error),
}

/// Serves one [`Application`] over HTTP/1.1.
pub struct Server {
    config: ServerConfig,
    app: Arc<dyn Application>,
    executor: Arc<dyn Executor>,
}

impl Server {
    /// Creates a server for `app`.
    ///
    /// Blocking calls go to a [`WorkerPool`] sized by
    /// [`ServerConfig::worker_threads`].
    pub fn new(config: ServerConfig, app: impl Application) -> Self {
        Self::from_arc(config, Arc::new(app))
    }

    /// Creates a server for an already shared application.
    pub fn from_arc(config: ServerConfig, app: Arc<dyn Application>) -> Self {
        let executor = Arc::new(WorkerPool::new(config.worker_threads()));
        Self {
            config,
            app,
            executor,
        }
    }

    /// Replaces the executor handed to the application.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("invalid address '{}': {e}", self.config.bind()))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Runs on an already bound listener until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Fails if lifespan startup or shutdown fails or times out. A failed
    /// startup means no connection is ever accepted; a fault reported while
    /// serving stops accepting and drains like a triggered shutdown.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let server = Arc::new(self);

        let lifespan = Lifespan::new(
            Arc::clone(&server.app),
            Arc::clone(&server.executor),
            &server.config,
        );
        let mut lifespan_task = tokio::spawn({
            let lifespan = lifespan.clone();
            async move { lifespan.handle_lifespan().await }
        });

        if let Err(e) = lifespan
            .wait_for_startup()
            .await
            .and_then(|()| lifespan.check_fault())
        {
            lifespan_task.abort();
            return Err(e.into());
        }

        tracing::info!("Server listening on {}", local_addr);

        let tracker = ConnectionTracker::new();
        let mut lifespan_done = false;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server
                                    .handle_connection(stream, remote_addr, local_addr, shutdown)
                                    .await
                                {
                                    tracing::debug!("Connection error from {}: {}", remote_addr, e);
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }

                joined = &mut lifespan_task, if !lifespan_done => {
                    lifespan_done = true;
                    if let Ok(Err(e)) = joined {
                        tracing::error!("Lifespan failed while serving, stopping server: {}", e);
                        shutdown.trigger();
                        break;
                    }
                }
            }
        }
        drop(listener);

        let graceful_timeout = server.config.graceful_timeout();
        tracing::info!(
            "Waiting up to {:?} for {} connections to close",
            graceful_timeout,
            tracker.active_connections()
        );

        if tokio::time::timeout(graceful_timeout, tracker.drained())
            .await
            .is_err()
        {
            tracing::warn!(
                "Graceful timeout reached, {} connections still active",
                tracker.active_connections()
            );
        }

        let result = lifespan
            .wait_for_shutdown()
            .await
            .and_then(|()| lifespan.check_fault());
        lifespan_task.abort();

        tracing::info!("Server stopped");
        result.map_err(Into::into)
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req, remote_addr, local_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!("Closing connection from {} for shutdown", remote_addr);
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
    ) -> Result<HttpResponse, Infallible> {
        let (parts, body) = req.into_parts();
        let scope = http_scope(
            &parts,
            Some(remote_addr),
            Some(local_addr),
            self.config.root_path(),
        );
        let collector = Arc::new(ResponseCollector::new());
        let send: Arc<dyn EventSender> = collector.clone();

        let result = self
            .app
            .call(
                scope.into(),
                Arc::new(BodyReceiver::new(body)),
                send,
                Arc::clone(&self.executor),
            )
            .await;

        match result {
            Ok(()) => Ok(collector.into_response()),
            Err(e) => {
                tracing::error!(
                    { fields::HTTP_METHOD } = %parts.method,
                    { fields::HTTP_PATH } = %parts.uri.path(),
                    { fields::ERROR } = %e,
                    "Application failed"
                );
                Ok(internal_error())
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::fixtures::InlineExecutor;
    use sluice_core::AsyncApp;

    fn noop_app() -> impl Application {
        AsyncApp::new(|_scope, _receive, _send| async { Ok(()) })
    }

    #[test]
    fn test_server_new() {
        let config = ServerConfig::builder().bind("127.0.0.1:8080").build();
        let server = Server::new(config, noop_app());
        assert_eq!(server.config().bind(), "127.0.0.1:8080");
    }

    #[test]
    fn test_server_with_executor() {
        let server = Server::new(ServerConfig::default(), noop_app())
            .with_executor(Arc::new(InlineExecutor));
        assert!(format!("{server:?}").contains("Server"));
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let config = ServerConfig::builder().bind("not-an-address").build();
        let result = Server::new(config, noop_app())
            .run_with_shutdown(ShutdownSignal::new())
            .await;
        assert!(matches!(result, Err(ServerError::Bind(_))));
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind("port in use".to_string());
        assert_eq!(err.to_string(), "bind error: port in use");

        let err: ServerError = sluice_core::Error::application("boom").into();
        assert_eq!(err.to_string(), "application error: boom");
    }
}
