//! # Core subscriber trait and the attach worker.
//!
//! `Subscribe` is the extension point for plugging event handlers into the
//! bus. [`attach`] wires a subscriber to its own [`Subscription`] behind a
//! worker task, so a slow handler backpressures only its own queue and a
//! panicking handler is isolated from the rest of the process.
//!
//! ## Contract
//! - Handlers may be slow (I/O, batching) — they delay only their own queue.
//! - Panics inside `on_event` are caught and logged; the worker keeps going.
//! - Cancelling the returned handle aborts the worker; its queue closes and
//!   publishers stop waiting on it.
//!
//! ## Example (skeleton)
//! ```
//! use binvisor::{Event, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) {
//!         let _ = ev; // write audit record...
//!     }
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should
/// prefer async I/O and cooperative waits over blocking the runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Worker handle returned by [`attach`].
///
/// Dropping the handle leaves the worker running; call
/// [`SubscriberHandle::cancel`] to stop it.
pub struct SubscriberHandle {
    worker: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Stops the worker. Its subscription closes, so publishers are never
    /// left waiting on the abandoned queue.
    pub fn cancel(&self) {
        self.worker.abort();
    }

    /// Awaits worker exit (after [`SubscriberHandle::cancel`] or bus drop).
    pub async fn join(self) {
        let _ = self.worker.await;
    }
}

/// Subscribes `subscriber` to `bus` behind a dedicated worker task.
///
/// The worker drains the subscription in publish order and survives handler
/// panics.
pub async fn attach(bus: &Bus, subscriber: Arc<dyn Subscribe>) -> SubscriberHandle {
    let mut sub = bus.subscribe().await;
    let worker = tokio::spawn(async move {
        while let Some(ev) = sub.recv().await {
            let handled = std::panic::AssertUnwindSafe(subscriber.on_event(&ev));
            if let Err(panic) = handled.catch_unwind().await {
                tracing::warn!(
                    subscriber = subscriber.name(),
                    panic = ?panic,
                    "subscriber panicked while handling an event"
                );
            }
        }
    });
    SubscriberHandle { worker }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::events::{EventKind, InvocationId};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    fn started(id: InvocationId) -> Event {
        Event::new(id, EventKind::RunStarted { pid: None })
    }

    #[tokio::test]
    async fn attached_subscriber_sees_events() {
        let bus = Bus::new(8);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let handle = attach(&bus, counter.clone()).await;

        let id = InvocationId::new();
        for _ in 0..3 {
            bus.publish(started(id)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
        handle.cancel();
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_stop_the_worker() {
        let bus = Bus::new(8);
        let handle = attach(&bus, Arc::new(Panicker)).await;

        let id = InvocationId::new();
        bus.publish(started(id)).await;
        bus.publish(started(id)).await;

        // Publishing still succeeds and the worker is still draining.
        tokio::time::timeout(Duration::from_secs(1), bus.publish(started(id)))
            .await
            .expect("publish must not hang on a panicking subscriber");
        handle.cancel();
        handle.join().await;
    }

    #[tokio::test]
    async fn cancelled_worker_frees_the_publisher() {
        let bus = Bus::new(1);
        let handle = attach(&bus, Arc::new(Panicker)).await;
        handle.cancel();
        handle.join().await;

        let id = InvocationId::new();
        for _ in 0..5 {
            tokio::time::timeout(Duration::from_secs(1), bus.publish(started(id)))
                .await
                .expect("publish must not wait on a cancelled subscriber");
        }
    }
}
