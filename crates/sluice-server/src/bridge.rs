//! Glue between hyper requests and the event protocol.
//!
//! [`http_scope`] describes a request, [`BodyReceiver`] streams its body as
//! `http.request` events and [`ResponseCollector`] turns the application's
//! response events back into an [`http::Response`].

use std::borrow::Cow;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use http::header::{HeaderName, HeaderValue};
use http::{Response, StatusCode, Version};
use hyper::body::Body;
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use sluice_core::{Error, EventReceiver, EventSender, HttpScope, ReceiveEvent, SendEvent, SluiceResult};

/// The response type produced by [`ResponseCollector`].
pub type HttpResponse = Response<Full<Bytes>>;

/// Builds the HTTP scope for a request.
///
/// The path is percent-decoded; the undecoded path is kept in `raw_path`.
#[must_use]
pub fn http_scope(
    parts: &http::request::Parts,
    client: Option<SocketAddr>,
    server: Option<SocketAddr>,
    root_path: &str,
) -> HttpScope {
    let raw_path = parts.uri.path();
    let mut scope = HttpScope::new(parts.method.as_str(), percent_decode(raw_path))
        .with_http_version(http_version(parts.version))
        .with_root_path(root_path)
        .with_query_string(Bytes::copy_from_slice(
            parts.uri.query().unwrap_or_default().as_bytes(),
        ));
    scope.raw_path = Some(Bytes::copy_from_slice(raw_path.as_bytes()));

    for (name, value) in &parts.headers {
        scope = scope.with_header(
            Bytes::copy_from_slice(name.as_str().as_bytes()),
            Bytes::copy_from_slice(value.as_bytes()),
        );
    }
    if let Some(addr) = client {
        scope = scope.with_client(addr.ip().to_string(), addr.port());
    }
    if let Some(addr) = server {
        scope = scope.with_server(addr.ip().to_string(), addr.port());
    }
    scope
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Decodes `%XX` sequences; malformed sequences are kept verbatim.
fn percent_decode(path: &str) -> Cow<'_, str> {
    match urlencoding::decode_binary(path.as_bytes()) {
        Cow::Borrowed(_) => Cow::Borrowed(path),
        Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Streams a request body as `http.request` events.
///
/// Each data frame becomes one event; trailers are skipped. After the final
/// chunk, or if the body fails, every call yields `http.disconnect`.
pub struct BodyReceiver<B> {
    body: tokio::sync::Mutex<Option<B>>,
}

impl<B> BodyReceiver<B> {
    /// Wraps `body`.
    pub fn new(body: B) -> Self {
        Self {
            body: tokio::sync::Mutex::new(Some(body)),
        }
    }
}

impl<B> EventReceiver for BodyReceiver<B>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::fmt::Display,
{
    fn receive(&self) -> BoxFuture<'_, SluiceResult<ReceiveEvent>> {
        Box::pin(async move {
            let mut slot = self.body.lock().await;
            let Some(body) = slot.as_mut() else {
                return Ok(ReceiveEvent::HttpDisconnect);
            };

            loop {
                match body.frame().await {
                    Some(Ok(frame)) => {
                        if let Ok(data) = frame.into_data() {
                            let more_body = !body.is_end_stream();
                            if !more_body {
                                *slot = None;
                            }
                            return Ok(ReceiveEvent::http_request(data, more_body));
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "request body failed");
                        *slot = None;
                        return Ok(ReceiveEvent::HttpDisconnect);
                    }
                    None => {
                        *slot = None;
                        return Ok(ReceiveEvent::http_request(Bytes::new(), false));
                    }
                }
            }
        })
    }
}

#[derive(Debug, Default)]
struct Collected {
    status: Option<u16>,
    headers: Vec<(Bytes, Bytes)>,
    body: BytesMut,
}

/// Assembles an HTTP response from `http.response.*` events.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    state: Mutex<Collected>,
}

impl ResponseCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once `http.response.start` has been received.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.lock().status.is_some()
    }

    /// Builds the response collected so far.
    ///
    /// Answers `500` with an empty body if no response was started.
    /// Headers that are not valid HTTP are dropped with a warning.
    #[must_use]
    pub fn into_response(&self) -> HttpResponse {
        let mut state = self.state.lock();
        let Some(status) = state.status else {
            return internal_error();
        };

        let mut response = Response::new(Full::new(std::mem::take(&mut state.body).freeze()));
        *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        for (name, value) in &state.headers {
            match (HeaderName::from_bytes(name), HeaderValue::from_bytes(value)) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => tracing::warn!(
                    header = %String::from_utf8_lossy(name),
                    "dropping invalid response header"
                ),
            }
        }
        response
    }
}

impl EventSender for ResponseCollector {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, SluiceResult<()>> {
        let result = {
            let mut state = self.state.lock();
            match event {
                SendEvent::HttpResponseStart { status, headers } if state.status.is_none() => {
                    state.status = Some(status);
                    state.headers = headers;
                    Ok(())
                }
                SendEvent::HttpResponseBody { body, .. } if state.status.is_some() => {
                    state.body.extend_from_slice(&body);
                    Ok(())
                }
                other => Err(Error::unexpected_message(other.type_name())),
            }
        };
        Box::pin(async move { result })
    }
}

/// An empty `500 Internal Server Error` response.
#[must_use]
pub fn internal_error() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
