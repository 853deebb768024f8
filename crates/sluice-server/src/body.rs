//! Request body accumulation.

use bytes::{Bytes, BytesMut};
use sluice_core::{Error, EventReceiver, ReceiveEvent, SluiceResult};

/// Drains `http.request` events from `receive` into one buffer.
///
/// Stops after the first chunk with `more_body == false`, or at the first
/// event of any other type (a disconnect ends the body). Fails with
/// [`Error::PayloadTooLarge`] as soon as the buffered size exceeds
/// `max_size`; no further chunks are read.
///
/// # Errors
///
/// Returns `PayloadTooLarge` on overflow, or whatever error `receive`
/// reports.
pub async fn read_body(receive: &dyn EventReceiver, max_size: usize) -> SluiceResult<Bytes> {
    let mut body = BytesMut::new();
    loop {
        match receive.receive().await? {
            ReceiveEvent::HttpRequest {
                body: chunk,
                more_body,
            } => {
                if body.len() + chunk.len() > max_size {
                    return Err(Error::payload_too_large(max_size));
                }
                body.extend_from_slice(&chunk);
                if !more_body {
                    break;
                }
            }
            other => {
                tracing::debug!(event = other.type_name(), "request body ended early");
                break;
            }
        }
    }
    Ok(body.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::fixtures::ScriptedReceiver;

    #[tokio::test]
    async fn test_concatenates_chunks() {
        let receive = ScriptedReceiver::chunks(["he", "ll", "o"]);
        let body = read_body(&receive, 1024).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"hello"));
        assert_eq!(receive.received(), 3);
    }

    #[tokio::test]
    async fn test_exact_limit_is_accepted() {
        let receive = ScriptedReceiver::chunks(["abc", "de"]);
        let body = read_body(&receive, 5).await.unwrap();
        assert_eq!(body.len(), 5);
    }

    #[tokio::test]
    async fn test_overflow_stops_reading() {
        let receive = ScriptedReceiver::chunks(["abcd", "efgh", "ijkl"]);
        let err = read_body(&receive, 6).await.unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge { limit: 6 }));
        assert_eq!(receive.received(), 2);
        assert_eq!(receive.remaining(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_ends_body() {
        let receive = ScriptedReceiver::new([
            ReceiveEvent::http_request("partial", true),
            ReceiveEvent::HttpDisconnect,
            ReceiveEvent::http_request("never", false),
        ]);
        let body = read_body(&receive, 1024).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"partial"));
        assert_eq!(receive.remaining(), 1);
    }

    #[tokio::test]
    async fn test_empty_body() {
        let receive = ScriptedReceiver::body(Bytes::new());
        assert!(read_body(&receive, 0).await.unwrap().is_empty());
    }
}
