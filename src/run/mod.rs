//! Run supervision: request, agent, and the caller-facing event stream.
//!
//! [`RunAgent`] drives one run-to-completion of the managed binary: spawn
//! through the runner seam, concurrent stdout/stderr draining, exit-code
//! classification. The caller gets a lazy [`EventStream`] mirroring the bus.

mod agent;
mod request;
mod stream;

pub use agent::RunAgent;
pub use request::RunRequest;
pub use stream::EventStream;
