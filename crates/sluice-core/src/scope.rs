//! Connection scopes.
//!
//! A [`Scope`] describes one incoming request or connection. The transport
//! creates it, owns it, and hands it to the application read-only.
//!
//! # Example
//!
//! ```
//! use sluice_core::{HttpScope, Scope};
//!
//! let scope = HttpScope::new("GET", "/api/users")
//!     .with_root_path("/api")
//!     .with_header("accept", "application/json");
//!
//! assert_eq!(Scope::Http(scope).type_name(), "http");
//! ```

use bytes::Bytes;

/// Version of the scope/event protocol spoken by Sluice.
pub const PROTOCOL_VERSION: &str = "3.0";

/// Version of the lifespan sub-protocol.
pub const LIFESPAN_SPEC_VERSION: &str = "2.0";

/// A host/port pair as carried by the `client` and `server` scope fields.
pub type HostPort = (String, u16);

/// Metadata describing one request or connection.
///
/// New protocol types may be added, so consumers must handle unknown
/// variants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Scope {
    /// A single HTTP request.
    Http(HttpScope),
    /// A WebSocket connection.
    Websocket(WebsocketScope),
    /// The process-wide lifespan handshake.
    Lifespan(LifespanScope),
}

impl Scope {
    /// Returns the protocol type name (`http`, `websocket`, `lifespan`).
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Websocket(_) => "websocket",
            Self::Lifespan(_) => "lifespan",
        }
    }

    /// Returns the HTTP scope, if this is one.
    #[must_use]
    pub const fn as_http(&self) -> Option<&HttpScope> {
        match self {
            Self::Http(scope) => Some(scope),
            _ => None,
        }
    }
}

impl From<HttpScope> for Scope {
    fn from(scope: HttpScope) -> Self {
        Self::Http(scope)
    }
}

impl From<WebsocketScope> for Scope {
    fn from(scope: WebsocketScope) -> Self {
        Self::Websocket(scope)
    }
}

impl From<LifespanScope> for Scope {
    fn from(scope: LifespanScope) -> Self {
        Self::Lifespan(scope)
    }
}

/// Scope of a single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpScope {
    /// HTTP version without the `HTTP/` prefix (`"1.0"`, `"1.1"`, `"2"`).
    pub http_version: String,
    /// Upper-case request method.
    pub method: String,
    /// URL scheme, `http` or `https`.
    pub scheme: String,
    /// Percent-decoded request path, including the root path.
    pub path: String,
    /// Request target exactly as received, if the transport kept it.
    pub raw_path: Option<Bytes>,
    /// Raw query string without the leading `?`.
    pub query_string: Bytes,
    /// Prefix the application is mounted under.
    pub root_path: String,
    /// Header name/value pairs in arrival order; names are lower-case.
    pub headers: Vec<(Bytes, Bytes)>,
    /// Remote peer address.
    pub client: Option<HostPort>,
    /// Local listening address.
    pub server: Option<HostPort>,
}

impl HttpScope {
    /// Creates an HTTP/1.1 scope for `method` and `path` with no headers.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_version: "1.1".to_string(),
            method: method.into(),
            scheme: "http".to_string(),
            path: path.into(),
            raw_path: None,
            query_string: Bytes::new(),
            root_path: String::new(),
            headers: Vec::new(),
            client: None,
            server: None,
        }
    }

    /// Sets the root path prefix.
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn with_query_string(mut self, query: impl Into<Bytes>) -> Self {
        self.query_string = query.into();
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the HTTP version.
    #[must_use]
    pub fn with_http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    /// Sets the URL scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the remote peer address.
    #[must_use]
    pub fn with_client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.client = Some((host.into(), port));
        self
    }

    /// Sets the local listening address.
    #[must_use]
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = Some((host.into(), port));
        self
    }
}

/// Scope of a WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsocketScope {
    /// HTTP version of the upgrade request.
    pub http_version: String,
    /// URL scheme, `ws` or `wss`.
    pub scheme: String,
    /// Percent-decoded request path.
    pub path: String,
    /// Raw query string.
    pub query_string: Bytes,
    /// Prefix the application is mounted under.
    pub root_path: String,
    /// Header name/value pairs of the upgrade request.
    pub headers: Vec<(Bytes, Bytes)>,
    /// Remote peer address.
    pub client: Option<HostPort>,
    /// Local listening address.
    pub server: Option<HostPort>,
    /// Subprotocols offered by the client.
    pub subprotocols: Vec<String>,
}

impl WebsocketScope {
    /// Creates a WebSocket scope for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            http_version: "1.1".to_string(),
            scheme: "ws".to_string(),
            path: path.into(),
            query_string: Bytes::new(),
            root_path: String::new(),
            headers: Vec::new(),
            client: None,
            server: None,
            subprotocols: Vec::new(),
        }
    }
}

/// Scope of the lifespan handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifespanScope {
    /// Protocol version of the outer scope/event protocol.
    pub version: String,
    /// Version of the lifespan sub-protocol.
    pub spec_version: String,
}

impl Default for LifespanScope {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            spec_version: LIFESPAN_SPEC_VERSION.to_string(),
        }
    }
}
