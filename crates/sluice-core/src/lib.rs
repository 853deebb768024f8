//! # Sluice Core
//!
//! Core types and traits for the Sluice application server.
//!
//! This crate provides the foundational types shared by every Sluice crate:
//!
//! - [`Scope`] - Per-request or per-connection metadata
//! - [`ReceiveEvent`] / [`SendEvent`] - Protocol events
//! - [`EventReceiver`] / [`EventSender`] - Channels handed to an application
//! - [`Application`] - The application calling convention
//! - [`Executor`] - The blocking-call offload seam
//! - [`Error`] - Standard error type and its [`ErrorKind`] classification

#![doc(html_root_url = "https://docs.rs/sluice-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod channel;
mod error;
mod event;
mod executor;
pub mod fixtures;
mod scope;

pub use app::{Application, AsyncApp};
pub use channel::{EventReceiver, EventSender};
pub use error::{Error, ErrorKind, LifespanStage, SluiceResult};
pub use event::{ReceiveEvent, SendEvent, WEBSOCKET_NORMAL_CLOSURE};
pub use executor::{BlockingTask, Executor, ExecutorExt};
pub use scope::{
    HostPort, HttpScope, LifespanScope, Scope, WebsocketScope, LIFESPAN_SPEC_VERSION,
    PROTOCOL_VERSION,
};

pub use futures_util::future::BoxFuture;
