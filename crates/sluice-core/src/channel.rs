//! Receive and send channels handed to an application.
//!
//! The transport implements [`EventReceiver`] and [`EventSender`] for each
//! connection; the lifespan state machine implements them over its own queue.

use futures_util::future::BoxFuture;

use crate::{ReceiveEvent, SendEvent, SluiceResult};

/// Source of events for one application call.
pub trait EventReceiver: Send + Sync {
    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) when no
    /// further events can arrive.
    fn receive(&self) -> BoxFuture<'_, SluiceResult<ReceiveEvent>>;
}

/// Sink for events emitted by one application call.
pub trait EventSender: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Implementations reject events that break their protocol, and report
    /// closed peers.
    fn send(&self, event: SendEvent) -> BoxFuture<'_, SluiceResult<()>>;
}
