//! Subscriber surface: trait, attach worker, and the bundled log renderer.
//!
//! Observers either hold a raw [`Subscription`](crate::Subscription) and
//! drain it themselves, or implement [`Subscribe`] and let [`attach`] run a
//! dedicated, panic-isolated worker for them.

mod log;
mod subscribe;

pub use log::LogWriter;
pub use subscribe::{attach, Subscribe, SubscriberHandle};
