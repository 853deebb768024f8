//! # Sluice Server
//!
//! Runs applications that speak the Sluice event protocol, and adapts
//! synchronous request/response applications to it.
//!
//! - [`SyncAdapter`] - Serves a [`SyncApplication`] through the event protocol
//! - [`Lifespan`] - Startup/shutdown handshake with the application
//! - [`Server`] - HTTP/1.1 server loop built on Hyper and Tokio
//! - [`WorkerPool`] - Bounded executor for blocking application calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_server::{response_iter, Server, ServerConfig, SyncAdapter, SyncFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().bind("0.0.0.0:8000").build();
//!     let app = SyncFn::new(|_environ, start_response| {
//!         start_response.start("200 OK", [("content-type", "text/plain")])?;
//!         Ok(response_iter(["hello"]))
//!     });
//!
//!     let adapter = SyncAdapter::new(app, config.max_body_size());
//!     Server::new(config, adapter).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/sluice-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod body;
mod bridge;
mod config;
mod environ;
mod executor;
mod lifespan;
mod server;
mod shutdown;
mod signal;
mod sync_app;

pub use adapter::SyncAdapter;
pub use body::read_body;
pub use bridge::{http_scope, internal_error, BodyReceiver, HttpResponse, ResponseCollector};
pub use config::{
    default_worker_threads, ServerConfig, ServerConfigBuilder, DEFAULT_BIND,
    DEFAULT_GRACEFUL_TIMEOUT_SECS, DEFAULT_LIFESPAN_TIMEOUT_SECS, DEFAULT_MAX_APP_QUEUE_SIZE,
    DEFAULT_MAX_BODY_SIZE,
};
pub use environ::{build_environ, Environ, DEFAULT_SERVER};
pub use executor::{BlockingExecutor, WorkerPool};
pub use lifespan::Lifespan;
pub use server::{Server, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
pub use signal::CompletionSignal;
pub use sync_app::{
    response_iter, run_sync_app, ResponseBody, StartResponse, SyncApplication, SyncFn,
    SyncResponse,
};
