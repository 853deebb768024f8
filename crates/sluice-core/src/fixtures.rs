//! Test fixtures for Sluice development and testing.
//!
//! In-memory implementations of the channel and executor seams, so that
//! adapters and applications can be driven without a transport.
//!
//! # Example
//!
//! ```
//! use sluice_core::fixtures::{RecordingSender, ScriptedReceiver};
//! use sluice_core::{EventReceiver, EventSender, ReceiveEvent, SendEvent};
//!
//! # tokio_test::block_on(async {
//! let receive = ScriptedReceiver::chunks(["hel", "lo"]);
//! assert_eq!(
//!     receive.receive().await.unwrap(),
//!     ReceiveEvent::http_request("hel", true)
//! );
//!
//! let send = RecordingSender::new();
//! send.send(SendEvent::response_body("ok")).await.unwrap();
//! assert_eq!(send.events().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::{BlockingTask, EventReceiver, EventSender, Executor, ReceiveEvent, SendEvent, SluiceResult};

/// A receiver that replays a fixed list of events.
///
/// Once the script is exhausted every call yields
/// [`ReceiveEvent::HttpDisconnect`].
#[derive(Debug, Default)]
pub struct ScriptedReceiver {
    events: Mutex<VecDeque<ReceiveEvent>>,
    received: Mutex<usize>,
}

impl ScriptedReceiver {
    /// Creates a receiver replaying `events` in order.
    pub fn new(events: impl IntoIterator<Item = ReceiveEvent>) -> Self {
        Self {
            events: Mutex::new(events.into_iter().collect()),
            received: Mutex::new(0),
        }
    }

    /// Creates a receiver with no scripted events.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a receiver delivering `body` as a single final chunk.
    pub fn body(body: impl Into<Bytes>) -> Self {
        Self::new([ReceiveEvent::http_request(body, false)])
    }

    /// Creates a receiver delivering each item as one body chunk.
    ///
    /// The last chunk is marked final; an empty iterator yields one empty
    /// final chunk.
    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
        if chunks.is_empty() {
            return Self::body(Bytes::new());
        }
        let last = chunks.len() - 1;
        Self::new(
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| ReceiveEvent::http_request(chunk, i != last)),
        )
    }

    /// Returns how many events have been handed out, disconnects included.
    pub fn received(&self) -> usize {
        *self.received.lock()
    }

    /// Returns how many scripted events were never received.
    pub fn remaining(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventReceiver for ScriptedReceiver {
    fn receive(&self) -> BoxFuture<'_, SluiceResult<ReceiveEvent>> {
        let event = self
            .events
            .lock()
            .pop_front()
            .unwrap_or(ReceiveEvent::HttpDisconnect);
        *self.received.lock() += 1;
        Box::pin(async move { Ok(event) })
    }
}

/// A sender that records every event it is given.
#[derive(Debug, Default)]
pub struct RecordingSender {
    events: Mutex<Vec<SendEvent>>,
}

impl RecordingSender {
    /// Creates an empty recording sender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<SendEvent> {
        self.events.lock().clone()
    }
}

impl EventSender for RecordingSender {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, SluiceResult<()>> {
        self.events.lock().push(event);
        Box::pin(async { Ok(()) })
    }
}

/// An executor that runs tasks on the calling thread.
///
/// Only suitable for tests: it blocks whichever thread awaits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: BlockingTask) -> BoxFuture<'_, SluiceResult<()>> {
        task();
        Box::pin(async { Ok(()) })
    }
}
