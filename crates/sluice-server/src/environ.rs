//! CGI-style environment for synchronous applications.
//!
//! [`build_environ`] turns an [`HttpScope`] and its buffered body into an
//! [`Environ`]: the fixed CGI keys, the `wsgi.*` stream and flag entries, and
//! one `HTTP_*` entry per distinct request header. Text that came off the
//! wire is decoded as Latin-1 so that every byte survives.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use sluice_core::HttpScope;
//! use sluice_server::build_environ;
//!
//! let scope = HttpScope::new("GET", "/app/items")
//!     .with_root_path("/app")
//!     .with_header("accept", "text/html")
//!     .with_header("accept", "application/json");
//!
//! let environ = build_environ(&scope, Bytes::new()).unwrap();
//! assert_eq!(environ.script_name, "/app");
//! assert_eq!(environ.path_info, "/items");
//! assert_eq!(environ.get("HTTP_ACCEPT").as_deref(), Some("text/html,application/json"));
//! ```

use std::borrow::Cow;
use std::io::Cursor;

use bytes::Bytes;
use sluice_core::{Error, HttpScope, SluiceResult};

/// Server address used when the scope does not carry one.
pub const DEFAULT_SERVER: (&str, u16) = ("localhost", 80);

/// The environment handed to a synchronous application.
///
/// Fields mirror the CGI and `wsgi.*` keys; [`Environ::get`] looks any of
/// the textual keys up by name.
#[derive(Debug)]
pub struct Environ {
    /// `REQUEST_METHOD`.
    pub request_method: String,
    /// `SCRIPT_NAME`: the root path the application is mounted at.
    pub script_name: String,
    /// `PATH_INFO`: the request path below `SCRIPT_NAME`, never empty.
    pub path_info: String,
    /// `QUERY_STRING`.
    pub query_string: String,
    /// `SERVER_NAME`.
    pub server_name: String,
    /// `SERVER_PORT`.
    pub server_port: u16,
    /// `SERVER_PROTOCOL`, e.g. `HTTP/1.1`.
    pub server_protocol: String,
    /// `CONTENT_TYPE`, if the request carried one.
    pub content_type: Option<String>,
    /// `CONTENT_LENGTH`, if the request carried one.
    pub content_length: Option<String>,
    /// `REMOTE_ADDR`, if the client address is known.
    pub remote_addr: Option<String>,
    /// `wsgi.version`.
    pub version: (u8, u8),
    /// `wsgi.url_scheme`.
    pub url_scheme: String,
    /// `wsgi.input`: the buffered request body.
    pub input: Cursor<Bytes>,
    /// `wsgi.errors`: bytes written here are logged after the call.
    pub errors: Vec<u8>,
    /// `wsgi.multithread`.
    pub multithread: bool,
    /// `wsgi.multiprocess`.
    pub multiprocess: bool,
    /// `wsgi.run_once`.
    pub run_once: bool,
    headers: Vec<(String, String)>,
}

impl Environ {
    /// Looks up a textual environ key.
    ///
    /// Covers the CGI keys, `HTTP_*` header entries and `wsgi.url_scheme`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "REQUEST_METHOD" => Some(Cow::Borrowed(&self.request_method)),
            "SCRIPT_NAME" => Some(Cow::Borrowed(&self.script_name)),
            "PATH_INFO" => Some(Cow::Borrowed(&self.path_info)),
            "QUERY_STRING" => Some(Cow::Borrowed(&self.query_string)),
            "SERVER_NAME" => Some(Cow::Borrowed(&self.server_name)),
            "SERVER_PORT" => Some(Cow::Owned(self.server_port.to_string())),
            "SERVER_PROTOCOL" => Some(Cow::Borrowed(&self.server_protocol)),
            "CONTENT_TYPE" => self.content_type.as_deref().map(Cow::Borrowed),
            "CONTENT_LENGTH" => self.content_length.as_deref().map(Cow::Borrowed),
            "REMOTE_ADDR" => self.remote_addr.as_deref().map(Cow::Borrowed),
            "wsgi.url_scheme" => Some(Cow::Borrowed(&self.url_scheme)),
            _ => self
                .headers
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| Cow::Borrowed(value.as_str())),
        }
    }

    /// Returns the `HTTP_*` entries in first-arrival order.
    pub fn http_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn append_header(&mut self, name: &[u8], value: &[u8]) {
        let name = latin1(name);
        let value = latin1(value);

        let slot = match name.as_str() {
            "content-length" => &mut self.content_length,
            "content-type" => &mut self.content_type,
            _ => {
                let key = format!("HTTP_{}", name.to_uppercase().replace('-', "_"));
                match self.headers.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => fold(existing, &value),
                    None => self.headers.push((key, value)),
                }
                return;
            }
        };
        match slot {
            Some(existing) => fold(existing, &value),
            None => *slot = Some(value),
        }
    }
}

fn fold(existing: &mut String, value: &str) {
    existing.push(',');
    existing.push_str(value);
}

/// Decodes bytes as Latin-1: every byte maps to the code point of equal value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Builds the environ for `scope` with `body` as the input stream.
///
/// # Errors
///
/// Returns [`Error::PathMismatch`] when the scope's path does not start
/// with its root path.
pub fn build_environ(scope: &HttpScope, body: Bytes) -> SluiceResult<Environ> {
    let path_info = scope
        .path
        .strip_prefix(scope.root_path.as_str())
        .ok_or_else(|| Error::path_mismatch(&scope.path, &scope.root_path))?;
    let path_info = if path_info.is_empty() { "/" } else { path_info };

    let (server_name, server_port) = scope.server.clone().unwrap_or_else(|| {
        let (host, port) = DEFAULT_SERVER;
        (host.to_string(), port)
    });

    let mut environ = Environ {
        request_method: scope.method.clone(),
        script_name: latin1(scope.root_path.as_bytes()),
        path_info: latin1(path_info.as_bytes()),
        query_string: latin1(&scope.query_string),
        server_name,
        server_port,
        server_protocol: format!("HTTP/{}", scope.http_version),
        content_type: None,
        content_length: None,
        remote_addr: scope.client.as_ref().map(|(host, _)| host.clone()),
        version: (1, 0),
        url_scheme: if scope.scheme.is_empty() {
            "http".to_string()
        } else {
            scope.scheme.clone()
        },
        input: Cursor::new(body),
        errors: Vec::new(),
        multithread: true,
        multiprocess: true,
        run_once: false,
        headers: Vec::new(),
    };

    for (name, value) in &scope.headers {
        environ.append_header(name, value);
    }

    Ok(environ)
}
