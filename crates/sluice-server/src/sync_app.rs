//! The synchronous application calling convention.
//!
//! A [`SyncApplication`] is called once per request on a blocking worker
//! with a mutable [`Environ`] and a [`StartResponse`] it must use to set
//! the status line and headers. It returns an iterator of body chunks.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use sluice_server::{response_iter, Environ, StartResponse, SyncFn};
//!
//! let app = SyncFn::new(|environ: &mut Environ, start: &mut StartResponse| {
//!     start.start("200 OK", [("Content-Type", "text/plain")])?;
//!     Ok(response_iter([Bytes::from(environ.path_info.clone())]))
//! });
//! # let _ = app;
//! ```

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use sluice_core::{Error, SluiceResult};

use crate::Environ;

/// The body returned by a synchronous application.
pub type ResponseBody = Box<dyn Iterator<Item = Bytes> + Send>;

/// Boxes any sendable iterator of chunks as a [`ResponseBody`].
pub fn response_iter<I, B>(chunks: I) -> ResponseBody
where
    I: IntoIterator<Item = B>,
    I::IntoIter: Send + 'static,
    B: Into<Bytes> + 'static,
{
    Box::new(chunks.into_iter().map(Into::into))
}

/// A blocking application.
pub trait SyncApplication: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// Must call [`StartResponse::start`] before returning a body.
    ///
    /// # Errors
    ///
    /// Any error aborts the request; the adapter reports it to the server.
    fn call(
        &self,
        environ: &mut Environ,
        start_response: &mut StartResponse,
    ) -> SluiceResult<ResponseBody>;
}

/// Wraps a closure as a [`SyncApplication`].
pub struct SyncFn<F> {
    func: F,
}

impl<F> SyncFn<F>
where
    F: Fn(&mut Environ, &mut StartResponse) -> SluiceResult<ResponseBody> + Send + Sync + 'static,
{
    /// Creates a new wrapper.
    #[must_use]
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for SyncFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncFn").finish_non_exhaustive()
    }
}

impl<F> SyncApplication for SyncFn<F>
where
    F: Fn(&mut Environ, &mut StartResponse) -> SluiceResult<ResponseBody> + Send + Sync + 'static,
{
    fn call(
        &self,
        environ: &mut Environ,
        start_response: &mut StartResponse,
    ) -> SluiceResult<ResponseBody> {
        (self.func)(environ, start_response)
    }
}

/// Captures the status line and headers chosen by the application.
#[derive(Debug, Default)]
pub struct StartResponse {
    status: Option<StatusCode>,
    headers: Vec<(Bytes, Bytes)>,
}

impl StartResponse {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response status line and headers.
    ///
    /// `status` is `"<code> <reason>"`; only the code is kept and the
    /// reason phrase may be omitted. Header names are lower-cased. A later
    /// call replaces an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the code is not a valid HTTP
    /// status or a header name or value is not ASCII.
    pub fn start<I, N, V>(&mut self, status: &str, headers: I) -> SluiceResult<()>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let code = status.split_once(' ').map_or(status, |(code, _)| code);
        let status = StatusCode::from_bytes(code.as_bytes())
            .map_err(|_| Error::invalid_response(format!("invalid status line {status:?}")))?;

        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                let (name, value) = (name.as_ref(), value.as_ref());
                if !name.is_ascii() || !value.is_ascii() {
                    return Err(Error::invalid_response(format!(
                        "non-ASCII response header {name:?}"
                    )));
                }
                Ok((
                    Bytes::from(name.to_ascii_lowercase()),
                    Bytes::copy_from_slice(value.as_bytes()),
                ))
            })
            .collect::<SluiceResult<Vec<_>>>()?;

        self.status = Some(status);
        self.headers = headers;
        Ok(())
    }

    /// Returns the captured status, if `start` has been called.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the captured headers.
    #[must_use]
    pub fn headers(&self) -> &[(Bytes, Bytes)] {
        &self.headers
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResponse {
    /// Response status.
    pub status: StatusCode,
    /// Header pairs with lower-case names.
    pub headers: Vec<(Bytes, Bytes)>,
    /// The whole response body.
    pub body: Bytes,
}

impl SyncResponse {
    /// A response with `status`, no headers and an empty body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }
}

/// Calls `app` once and drains its body.
///
/// Runs on the calling thread; the adapter invokes it through an executor.
/// Anything the application wrote to `environ.errors` is logged at `warn`.
///
/// # Errors
///
/// Propagates the application's error, or [`Error::InvalidResponse`] if it
/// never called `start_response`.
pub fn run_sync_app(app: &dyn SyncApplication, mut environ: Environ) -> SluiceResult<SyncResponse> {
    let mut start_response = StartResponse::new();
    let result = app.call(&mut environ, &mut start_response);
    log_error_stream(&environ.errors);
    let chunks = result?;

    let mut body = BytesMut::new();
    for chunk in chunks {
        body.extend_from_slice(&chunk);
    }

    let status = start_response
        .status
        .ok_or_else(|| Error::invalid_response("application did not call start_response"))?;

    Ok(SyncResponse {
        status,
        headers: start_response.headers,
        body: body.freeze(),
    })
}

fn log_error_stream(errors: &[u8]) {
    if errors.is_empty() {
        return;
    }
    for line in String::from_utf8_lossy(errors).lines() {
        tracing::warn!(output = line, "application error stream");
    }
}
