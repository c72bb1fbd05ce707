//! # Event bus: bounded broadcast with backpressure.
//!
//! [`Bus`] fans every published [`Event`] out to all live [`Subscription`]s.
//! It is an explicitly constructed value with a defined lifecycle — created
//! where the process wires itself up, cloned into each agent, dropped when
//! the process stops — never an ambient singleton, so tests can instantiate
//! isolated buses.
//!
//! ## Architecture
//! ```text
//! Publishers (agents):                 Subscribers:
//!   UpdateAgent ──┐                      ┌─► [queue S1] ─► Subscription 1
//!   RunAgent    ──┼──► publish() ────────┼─► [queue S2] ─► Subscription 2
//!   RunAgent    ──┘   (serialized)       └─► [queue SN] ─► Subscription N
//! ```
//!
//! ## Rules
//! - **Backpressure, not loss**: `publish()` suspends while any live
//!   subscriber's queue is full. Events are never silently dropped.
//! - **No replay**: a subscription only observes events published after it
//!   was created. There is no persistent log; a delivered event is gone.
//! - **Dead subscribers cannot starve publishers**: dropping (or closing) a
//!   [`Subscription`] closes its queue; sends to it fail immediately and the
//!   stale sender is pruned on that publish.
//! - **Order**: each subscriber sees events in publish order. Publishes are
//!   serialized internally, so concurrent publishers cannot interleave
//!   differently for different subscribers.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::event::Event;

/// Bounded broadcast channel for lifecycle events.
///
/// Cheap to clone (internally `Arc`-backed); clones share the subscriber
/// set. Capacity is per subscriber queue, clamped to a minimum of 1.
#[derive(Clone)]
pub struct Bus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<Event>>>>,
    capacity: usize,
}

impl Bus {
    /// Creates a bus whose subscriber queues hold `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Delivers `event` to every live subscriber, in subscription order.
    ///
    /// Suspends while a subscriber's queue is full; returns once every live
    /// subscriber has accepted the event. Senders whose subscription was
    /// dropped are pruned. With no subscribers this is a no-op.
    pub async fn publish(&self, event: Event) {
        let mut subs = self.subscribers.lock().await;
        let mut pruned = false;
        for tx in subs.iter() {
            if tx.send(event.clone()).await.is_err() {
                pruned = true;
            }
        }
        if pruned {
            subs.retain(|tx| !tx.is_closed());
        }
    }

    /// Registers a new subscriber and returns its independent event sequence.
    ///
    /// The subscription observes only events published from this point
    /// forward (no replay).
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.lock().await.push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers (stale senders are not counted).
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .await
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// One subscriber's independent view of the bus.
///
/// Dropping the subscription cancels it: the queue closes, pending events
/// are discarded, and publishers stop waiting on it.
pub struct Subscription {
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event, in publish order.
    ///
    /// Returns `None` once the subscription is closed and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Cancels the subscription without dropping it.
    ///
    /// Publishers stop waiting on this queue immediately; events already
    /// queued can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
