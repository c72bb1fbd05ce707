//! # EventStream: the lazy event sequence handed back by the run agent.
//!
//! Mirrors the invocation's bus publications one-to-one, so a caller may
//! consume this stream directly, observe the bus, or both. Dropping the
//! stream does not affect the invocation — events keep flowing to the bus.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::events::{Event, InvocationId};

/// Lazy, finite sequence of one invocation's events.
///
/// The first event is always `RunStarted`; the last is exactly one of
/// `RunResult` or `RunFailed`, after which the stream ends.
pub struct EventStream {
    id: InvocationId,
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(id: InvocationId, rx: mpsc::Receiver<Event>) -> Self {
        Self { id, rx }
    }

    /// Correlation id of the invocation this stream belongs to.
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Receives the next event, in emission order.
    ///
    /// Returns `None` after the terminal event has been delivered.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Drains the stream to completion and returns all events in order.
    pub async fn collect(mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(ev) = self.recv().await {
            events.push(ev);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
