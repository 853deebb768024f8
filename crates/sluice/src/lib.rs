//! # Sluice
//!
//! **An application server that runs synchronous request/response
//! applications and asynchronous event-driven applications side by side.**
//!
//! - **Synchronous adapter**: serves a blocking [`SyncApplication`](server::SyncApplication)
//!   through the event protocol, running each call on a bounded worker pool
//! - **Lifespan**: startup and shutdown handshake with timeouts
//! - **Server**: HTTP/1.1 on Hyper and Tokio with graceful shutdown
//! - **Ambient stack**: layered configuration, structured logging, Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sluice::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("sluice.toml")?
//!         .with_env_prefix("SLUICE")
//!         .load()?;
//!
//!     let app = SyncFn::new(|_environ, start_response| {
//!         start_response.start("200 OK", [("content-type", "text/plain")])?;
//!         Ok(response_iter(["hello"]))
//!     });
//!
//!     let adapter = SyncAdapter::new(app, config.server.max_body_size);
//!     sluice::serve(&config, adapter).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/sluice/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod init;

pub use init::{init_from_config, log_config, metrics_config, serve, InitError};

// Re-export core types
pub use sluice_core as core;

// Re-export server types
pub use sluice_server as server;

// Re-export configuration types
pub use sluice_config as config;

// Re-export observability
pub use sluice_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use sluice::prelude::*;
/// ```
pub mod prelude {
    pub use sluice_core::{
        Application, AsyncApp, Error, EventReceiver, EventSender, Executor, ExecutorExt,
        HttpScope, ReceiveEvent, Scope, SendEvent, SluiceResult,
    };

    pub use sluice_server::{
        response_iter, Environ, ResponseBody, Server, ServerConfig, ShutdownSignal,
        StartResponse, SyncAdapter, SyncApplication, SyncFn, WorkerPool,
    };

    pub use sluice_config::{ConfigLoader, SluiceConfig};

    pub use crate::{init_from_config, serve, InitError};
}
