//! Process runner: the seam between the agents and the operating system.
//!
//! The agents never touch `tokio::process` directly; they depend on the
//! [`ProcessRunner`] contract, which spawns a command and hands back a
//! [`ProcessHandle`] exposing two lazy line-oriented output streams, an
//! awaitable exit code, and termination. Deployments with their own process
//! layer substitute the trait.
//!
//! ## Contents
//! - [`ProcessRunner`], [`ProcessHandle`], [`CommandSpec`], [`OutputLines`] —
//!   the contract
//! - [`SystemRunner`] — real child processes via `tokio::process`
//! - [`ScriptedRunner`], [`Script`] — canned processes for tests and
//!   environment-limited scenarios
//!
//! ## Rules
//! - A spawn failure ([`RunnerError::Spawn`](crate::RunnerError::Spawn)) is
//!   never conflated with a non-zero exit code; the latter is a plain value
//!   from [`ProcessHandle::wait`].
//! - Output streams are finite: they end when the child closes the pipe.
//! - [`ProcessHandle::terminate`] kills the child; it never just detaches.

mod contract;
mod script;
mod system;

pub use contract::{CommandSpec, OutputLines, ProcessHandle, ProcessRunner};
pub use script::{Script, ScriptedRunner};
pub use system::SystemRunner;
