//! # binvisor
//!
//! **Binvisor** orchestrates two operations on a managed external binary:
//! safely **updating** it on disk (with verification and atomic activation)
//! and **running** it as a supervised child process (with live output
//! streaming). Both report progress and outcome through a shared broadcast
//! [`Bus`], decoupling the orchestration from any presentation layer.
//!
//! ## Architecture
//! ```text
//!   run_update(source)              run_binary(request)
//!         │                                 │
//!         ▼                                 ▼
//! ┌───────────────────┐          ┌────────────────────┐
//! │    UpdateAgent    │          │      RunAgent      │
//! │  fetch → verify   │          │  spawn → drain     │
//! │  → extract        │          │  stdout ∥ stderr   │
//! │  → sanity-check   │          │  → exit code       │
//! │  → atomic swap    │          │                    │
//! │  → record         │          │                    │
//! └──────┬────────────┘          └──────┬─────────┬───┘
//!        │ publish                      │ publish │ EventStream
//!        ▼                              ▼         ▼ (lazy, to caller)
//! ┌───────────────────────────────────────────┐
//! │           Bus (bounded fan-out)           │
//! │   one queue per Subscription, publish     │
//! │   suspends while a queue is full          │
//! └──────┬──────────────┬─────────────┬───────┘
//!        ▼              ▼             ▼
//!   Subscription   Subscription   Subscription
//!   (caller)       (LogWriter)    (custom Subscribe)
//! ```
//!
//! Agents are independent of each other and of any subscriber; the bus is
//! the only coupling point. Every invocation gets its own [`InvocationId`]
//! and all of its events carry that id, so consumers can correlate a
//! causally-ordered sub-sequence out of the interleaved global stream.
//!
//! ## Update guarantees
//! The live binary at `<current_root>/<artifact_name>` is replaced only by a
//! filesystem-level rename of a staged artifact that already passed the
//! sanity probe. A reader of the live path observes either the old binary or
//! the new one, never a partial write. On a failed swap the previous
//! artifact is restored and [`EventKind::RollbackPerformed`] is published.
//!
//! ## Run guarantees
//! The event sequence for one run starts with [`EventKind::RunStarted`] and
//! ends with exactly one of [`EventKind::RunResult`] or
//! [`EventKind::RunFailed`]. stdout and stderr are drained concurrently, so
//! a child that fills one pipe while the other is idle cannot deadlock.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use binvisor::{Bus, Config, RunAgent, RunRequest, SystemRunner};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = Config::default();
//!     let bus = Bus::new(cfg.bus_capacity);
//!     let agent = RunAgent::new(&cfg, bus.clone(), Arc::new(SystemRunner::new()));
//!
//!     let request = RunRequest::new("/usr/bin/env").with_args(["true"]);
//!     let mut events = agent.run_binary(request, CancellationToken::new());
//!
//!     while let Some(ev) = events.recv().await {
//!         println!("{:?}", ev.kind);
//!     }
//! }
//! ```

mod config;
mod error;
mod events;
mod run;
mod runner;
mod subscribers;
mod update;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{RunError, RunnerError, UpdateError};
pub use events::{
    Bus, Event, EventKind, InvocationId, RunState, StreamKind, Subscription, UpdatePhase,
};
pub use run::{EventStream, RunAgent, RunRequest};
pub use runner::{
    CommandSpec, OutputLines, ProcessHandle, ProcessRunner, Script, ScriptedRunner, SystemRunner,
};
pub use subscribers::{attach, LogWriter, Subscribe, SubscriberHandle};
pub use update::{
    Fetched, FileSource, NoopVerifier, ProbeReport, SanityProbe, Sha256Verifier, UpdateAgent,
    UpdateResult, UpdateSource, Verifier, VersionProbe,
};
