//! Protocol events exchanged between the server and an application.
//!
//! [`ReceiveEvent`]s flow from the server into the application through an
//! [`EventReceiver`](crate::EventReceiver); [`SendEvent`]s flow back out
//! through an [`EventSender`](crate::EventSender).

use bytes::Bytes;

use crate::LifespanStage;

/// Close code sent when the server declines a WebSocket connection normally.
pub const WEBSOCKET_NORMAL_CLOSURE: u16 = 1000;

/// An event delivered to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// A chunk of the HTTP request body.
    HttpRequest {
        /// Body bytes of this chunk.
        body: Bytes,
        /// Whether more chunks follow.
        more_body: bool,
    },
    /// The HTTP client went away.
    HttpDisconnect,
    /// A WebSocket client asks to connect.
    WebsocketConnect,
    /// The WebSocket client went away.
    WebsocketDisconnect {
        /// Close code reported by the client.
        code: u16,
    },
    /// The server asks the application to start up.
    LifespanStartup,
    /// The server asks the application to shut down.
    LifespanShutdown,
}

impl ReceiveEvent {
    /// Creates a body chunk event.
    pub fn http_request(body: impl Into<Bytes>, more_body: bool) -> Self {
        Self::HttpRequest {
            body: body.into(),
            more_body,
        }
    }

    /// Returns the lifespan request event for `stage`.
    #[must_use]
    pub const fn lifespan(stage: LifespanStage) -> Self {
        match stage {
            LifespanStage::Startup => Self::LifespanStartup,
            LifespanStage::Shutdown => Self::LifespanShutdown,
        }
    }

    /// Returns the protocol type name of this event.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::HttpRequest { .. } => "http.request",
            Self::HttpDisconnect => "http.disconnect",
            Self::WebsocketConnect => "websocket.connect",
            Self::WebsocketDisconnect { .. } => "websocket.disconnect",
            Self::LifespanStartup => "lifespan.startup",
            Self::LifespanShutdown => "lifespan.shutdown",
        }
    }
}

/// An event emitted by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// Start of an HTTP response.
    HttpResponseStart {
        /// Numeric status code.
        status: u16,
        /// Header name/value pairs; names are lower-case.
        headers: Vec<(Bytes, Bytes)>,
    },
    /// A chunk of the HTTP response body.
    HttpResponseBody {
        /// Body bytes of this chunk.
        body: Bytes,
        /// Whether more chunks follow.
        more_body: bool,
    },
    /// Close (or refuse) a WebSocket connection.
    WebsocketClose {
        /// Close code.
        code: u16,
    },
    /// Startup finished.
    LifespanStartupComplete,
    /// Startup failed.
    LifespanStartupFailed {
        /// Failure description.
        message: String,
    },
    /// Shutdown finished.
    LifespanShutdownComplete,
    /// Shutdown failed.
    LifespanShutdownFailed {
        /// Failure description.
        message: String,
    },
}

impl SendEvent {
    /// Creates a response start event.
    pub fn response_start(status: u16, headers: Vec<(Bytes, Bytes)>) -> Self {
        Self::HttpResponseStart { status, headers }
    }

    /// Creates a final response body event.
    pub fn response_body(body: impl Into<Bytes>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: false,
        }
    }

    /// Creates a WebSocket close event with the normal closure code.
    #[must_use]
    pub const fn websocket_close() -> Self {
        Self::WebsocketClose {
            code: WEBSOCKET_NORMAL_CLOSURE,
        }
    }

    /// Creates the `complete` event for `stage`.
    #[must_use]
    pub const fn lifespan_complete(stage: LifespanStage) -> Self {
        match stage {
            LifespanStage::Startup => Self::LifespanStartupComplete,
            LifespanStage::Shutdown => Self::LifespanShutdownComplete,
        }
    }

    /// Creates the `failed` event for `stage`.
    pub fn lifespan_failed(stage: LifespanStage, message: impl Into<String>) -> Self {
        let message = message.into();
        match stage {
            LifespanStage::Startup => Self::LifespanStartupFailed { message },
            LifespanStage::Shutdown => Self::LifespanShutdownFailed { message },
        }
    }

    /// Returns the protocol type name of this event.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::HttpResponseStart { .. } => "http.response.start",
            Self::HttpResponseBody { .. } => "http.response.body",
            Self::WebsocketClose { .. } => "websocket.close",
            Self::LifespanStartupComplete => "lifespan.startup.complete",
            Self::LifespanStartupFailed { .. } => "lifespan.startup.failed",
            Self::LifespanShutdownComplete => "lifespan.shutdown.complete",
            Self::LifespanShutdownFailed { .. } => "lifespan.shutdown.failed",
        }
    }
}
