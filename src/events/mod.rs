//! Lifecycle events: data model and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the update and run agents.
//!
//! ## Contents
//! - [`Event`], [`EventKind`] — classification and payloads
//! - [`InvocationId`] — correlation id shared by one invocation's events
//! - [`UpdatePhase`], [`StreamKind`], [`RunState`] — payload vocabulary
//! - [`Bus`], [`Subscription`] — bounded fan-out with backpressure
//!
//! ## Quick reference
//! - **Publishers**: `UpdateAgent`, `RunAgent`.
//! - **Consumers**: caller subscriptions, `subscribers::attach` workers,
//!   and the `EventStream` handed back by the run agent.

mod bus;
mod event;

pub use bus::{Bus, Subscription};
pub use event::{Event, EventKind, InvocationId, RunState, StreamKind, UpdatePhase};
