//! Error types for Sluice.
//!
//! This module provides the [`Error`] type shared by every Sluice crate, and
//! the [`ErrorKind`] tag used to decide how a failure is handled.
//!
//! | `ErrorKind` | Variants | Handling |
//! |---|---|---|
//! | `Precondition` | `PayloadTooLarge`, `PathMismatch` | Answered locally with a fixed status |
//! | `Protocol` | `UnexpectedMessage`, `UnknownScopeType` | Fatal, propagated |
//! | `LifespanFailure` | `LifespanFailure` | Fatal, propagated |
//! | `Timeout` | `LifespanTimeout` | Reported to the boot sequence |
//! | `Application` | `Application`, `InvalidResponse` | Request or lifespan level |
//! | `Runtime` | `Offload`, `ChannelClosed` | Request or lifespan level |

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type SluiceResult<T> = Result<T, Error>;

/// The two stages of the lifespan handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifespanStage {
    /// Application startup, before traffic is accepted.
    Startup,
    /// Application shutdown, after traffic has stopped.
    Shutdown,
}

impl LifespanStage {
    /// Returns the stage name used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for LifespanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A request precondition was violated (oversized body, path mismatch).
    Precondition,
    /// The application or transport broke the event protocol.
    Protocol,
    /// The application explicitly reported a lifespan failure.
    LifespanFailure,
    /// A lifespan stage did not complete in time.
    Timeout,
    /// The application failed or produced an unusable response.
    Application,
    /// The runtime plumbing around the application failed.
    Runtime,
}

impl ErrorKind {
    /// Returns `true` for kinds that must bring the server down.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Protocol | Self::LifespanFailure)
    }
}

/// Standard error type for Sluice.
///
/// # Example
///
/// ```
/// use sluice_core::{Error, ErrorKind, LifespanStage};
///
/// let err = Error::lifespan_failure(LifespanStage::Startup, "database unreachable");
/// assert_eq!(err.kind(), ErrorKind::LifespanFailure);
/// assert!(err.kind().is_fatal());
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The request body grew past the configured maximum.
    #[error("request body exceeds the maximum of {limit} bytes")]
    PayloadTooLarge {
        /// The configured maximum body size.
        limit: usize,
    },

    /// The request path does not start with the scope's root path.
    #[error("path {path:?} is not under root path {root_path:?}")]
    PathMismatch {
        /// The request path.
        path: String,
        /// The root path it was expected to start with.
        root_path: String,
    },

    /// An event of the wrong type arrived on a channel.
    #[error("unexpected message type: {0}")]
    UnexpectedMessage(String),

    /// A scope of a type this component cannot handle.
    #[error("unknown scope type: {0}")]
    UnknownScopeType(String),

    /// The application sent a `lifespan.*.failed` event.
    #[error("lifespan {stage} failure: {message}")]
    LifespanFailure {
        /// The stage that failed.
        stage: LifespanStage,
        /// The message supplied by the application.
        message: String,
    },

    /// A lifespan stage did not complete within its timeout.
    #[error("lifespan {stage} timed out")]
    LifespanTimeout {
        /// The stage that timed out.
        stage: LifespanStage,
    },

    /// The application itself failed.
    #[error("application error: {message}")]
    Application {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The application produced a response that cannot be sent.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A blocking call could not be run or did not return a result.
    #[error("offloaded call failed: {0}")]
    Offload(String),

    /// The peer side of a receive or send channel is gone.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl Error {
    /// Creates a payload-too-large error.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::PayloadTooLarge { limit }
    }

    /// Creates a path mismatch error.
    #[must_use]
    pub fn path_mismatch(path: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self::PathMismatch {
            path: path.into(),
            root_path: root_path.into(),
        }
    }

    /// Creates an unexpected message error.
    #[must_use]
    pub fn unexpected_message(type_name: impl Into<String>) -> Self {
        Self::UnexpectedMessage(type_name.into())
    }

    /// Creates an unknown scope type error.
    #[must_use]
    pub fn unknown_scope_type(type_name: impl Into<String>) -> Self {
        Self::UnknownScopeType(type_name.into())
    }

    /// Creates a lifespan failure error.
    #[must_use]
    pub fn lifespan_failure(stage: LifespanStage, message: impl Into<String>) -> Self {
        Self::LifespanFailure {
            stage,
            message: message.into(),
        }
    }

    /// Creates a lifespan timeout error.
    #[must_use]
    pub fn lifespan_timeout(stage: LifespanStage) -> Self {
        Self::LifespanTimeout { stage }
    }

    /// Creates an application error with a message.
    #[must_use]
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an application error with a source.
    #[must_use]
    pub fn application_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Application {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Creates an offload error.
    #[must_use]
    pub fn offload(message: impl Into<String>) -> Self {
        Self::Offload(message.into())
    }

    /// Creates a channel closed error.
    #[must_use]
    pub fn channel_closed(message: impl Into<String>) -> Self {
        Self::ChannelClosed(message.into())
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PayloadTooLarge { .. } | Self::PathMismatch { .. } => ErrorKind::Precondition,
            Self::UnexpectedMessage(_) | Self::UnknownScopeType(_) => ErrorKind::Protocol,
            Self::LifespanFailure { .. } => ErrorKind::LifespanFailure,
            Self::LifespanTimeout { .. } => ErrorKind::Timeout,
            Self::Application { .. } | Self::InvalidResponse(_) => ErrorKind::Application,
            Self::Offload(_) | Self::ChannelClosed(_) => ErrorKind::Runtime,
        }
    }

    /// Returns the fixed response status for precondition errors.
    ///
    /// Oversized bodies answer `400 Bad Request` and path mismatches answer
    /// `404 Not Found`. Every other error has no local status.
    #[must_use]
    pub const fn precondition_status(&self) -> Option<StatusCode> {
        match self {
            Self::PayloadTooLarge { .. } => Some(StatusCode::BAD_REQUEST),
            Self::PathMismatch { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    /// Returns the lifespan stage this error refers to, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<LifespanStage> {
        match self {
            Self::LifespanFailure { stage, .. } | Self::LifespanTimeout { stage } => Some(*stage),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Self::Application {
            message: source.to_string(),
            source: Some(source),
        }
    }
}
