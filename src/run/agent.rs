//! # RunAgent: spawn, stream, classify.
//!
//! Drives one run-to-completion of the managed binary through the
//! [`ProcessRunner`] seam, emitting lifecycle events to the bus and to the
//! caller's [`EventStream`].
//!
//! ## Event flow
//! ```text
//! Spawn ok:
//!   RunStarted{pid} → RunStatus{running}
//!     → RunLine*            (stdout ∥ stderr, emitted as read)
//!     → RunStatus{stopped, code}
//!     → RunResult           (code == 0)
//!     → RunFailed           (code != 0, reason=process_failed)
//!
//! Spawn failure:
//!   RunStarted{pid: None} → RunFailed{reason=spawn_failed}
//!
//! Cancellation:
//!   … → RunStatus{killed} → RunFailed{reason=process_failed}
//! ```
//!
//! ## Rules
//! - The first event is always `RunStarted`; the last is exactly one of
//!   `RunResult` or `RunFailed`.
//! - Both output streams are drained concurrently with each other
//!   (join barrier) so a runner buffering one pipe can never deadlock the
//!   other; per-stream line order is preserved, interleaving between the
//!   streams is not specified.
//! - Cancellation terminates the child, never detaches from it.
//! - No retries here; retrying is caller policy.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind, InvocationId, RunState, StreamKind};
use crate::runner::{CommandSpec, OutputLines, ProcessHandle, ProcessRunner};

use super::request::RunRequest;
use super::stream::EventStream;

/// Number of trailing stderr lines kept as the failure sample.
const STDERR_SAMPLE_LINES: usize = 4;

/// Drives supervised runs of the managed binary.
///
/// Cheap to clone-construct per call site; holds only the bus and the
/// runner. Invocations are independent and may execute concurrently, each
/// under its own [`InvocationId`].
pub struct RunAgent {
    bus: Bus,
    runner: Arc<dyn ProcessRunner>,
    stream_capacity: usize,
}

impl RunAgent {
    /// Creates an agent publishing to `bus` and spawning through `runner`.
    pub fn new(cfg: &Config, bus: Bus, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            bus,
            runner,
            stream_capacity: cfg.stream_capacity.max(1),
        }
    }

    /// Starts one run and returns its lazy event sequence.
    ///
    /// The invocation proceeds regardless of whether the stream is consumed;
    /// events are always side-published to the bus. Cancelling `cancel`
    /// terminates the child process and ends the sequence with `RunFailed`.
    pub fn run_binary(&self, request: RunRequest, cancel: CancellationToken) -> EventStream {
        let id = InvocationId::new();
        let (tx, rx) = mpsc::channel(self.stream_capacity);
        let emitter = Emitter {
            id,
            bus: self.bus.clone(),
            tx,
        };
        tokio::spawn(drive(emitter, Arc::clone(&self.runner), request, cancel));
        EventStream::new(id, rx)
    }
}

/// Publishes one invocation's events to the bus and the caller stream.
struct Emitter {
    id: InvocationId,
    bus: Bus,
    tx: mpsc::Sender<Event>,
}

impl Emitter {
    async fn emit(&self, kind: EventKind) {
        let ev = Event::new(self.id, kind);
        self.bus.publish(ev.clone()).await;
        // The caller may have dropped its stream; the bus remains served.
        let _ = self.tx.send(ev).await;
    }
}

/// Executes one run to its terminal event.
async fn drive(
    emitter: Emitter,
    runner: Arc<dyn ProcessRunner>,
    request: RunRequest,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let command = CommandSpec {
        program: request.binary_path.clone(),
        args: request.args.clone(),
        env_profile: request.env_profile.clone(),
    };

    let mut handle = match runner.run(&command, &request.working_dir).await {
        Ok(handle) => handle,
        Err(err) => {
            emitter.emit(EventKind::RunStarted { pid: None }).await;
            let classified = RunError::Spawn { detail: err.to_string() };
            fail(&emitter, &classified, Some(err.to_string())).await;
            return;
        }
    };

    emitter
        .emit(EventKind::RunStarted { pid: handle.pid() })
        .await;
    emitter
        .emit(EventKind::RunStatus {
            exit_code: None,
            state: RunState::Running,
        })
        .await;

    let stdout = handle.take_stdout();
    let stderr = handle.take_stderr();

    let streams = tokio::select! {
        _ = cancel.cancelled() => None,
        drained = async {
            tokio::join!(
                drain(stdout, StreamKind::Stdout, &emitter),
                drain(stderr, StreamKind::Stderr, &emitter),
            )
        } => Some(drained),
    };
    let Some((out, err)) = streams else {
        kill(handle.as_mut(), &emitter).await;
        return;
    };

    let waited = tokio::select! {
        _ = cancel.cancelled() => None,
        code = handle.wait() => Some(code),
    };
    let code = match waited {
        None => {
            kill(handle.as_mut(), &emitter).await;
            return;
        }
        Some(Err(io)) => {
            let classified = RunError::Unknown { detail: io.to_string() };
            fail(&emitter, &classified, err.sample()).await;
            return;
        }
        Some(Ok(code)) => code,
    };

    emitter
        .emit(EventKind::RunStatus {
            exit_code: Some(code),
            state: RunState::Stopped,
        })
        .await;

    if code == 0 {
        emitter
            .emit(EventKind::RunResult {
                exit_code: 0,
                duration_ms: started.elapsed().as_millis() as u64,
                stdout_summary: out.last,
                stderr_summary: err.last,
                logs_path: None,
            })
            .await;
    } else {
        let classified = RunError::ProcessFailed { code };
        let sample = err.sample().unwrap_or_else(|| classified.to_string());
        fail(&emitter, &classified, Some(sample)).await;
    }
}

/// Terminates the child after cancellation and emits the terminal events.
async fn kill(handle: &mut dyn ProcessHandle, emitter: &Emitter) {
    if let Err(e) = handle.terminate().await {
        tracing::warn!(error = %e, "failed to terminate child on cancellation");
    }
    emitter
        .emit(EventKind::RunStatus {
            exit_code: None,
            state: RunState::Killed,
        })
        .await;
    fail(emitter, &RunError::Killed, None).await;
}

/// Publishes the single terminal `RunFailed` event.
async fn fail(emitter: &Emitter, err: &RunError, stderr_sample: Option<String>) {
    emitter
        .emit(EventKind::RunFailed {
            reason: err.as_label().to_string(),
            stderr_sample,
        })
        .await;
}

/// Tail state accumulated while draining one stream.
#[derive(Default)]
struct Drained {
    last: Option<String>,
    tail: Vec<String>,
}

impl Drained {
    fn push(&mut self, line: &str) {
        self.last = Some(line.to_string());
        if self.tail.len() == STDERR_SAMPLE_LINES {
            self.tail.remove(0);
        }
        self.tail.push(line.to_string());
    }

    fn sample(&self) -> Option<String> {
        if self.tail.is_empty() {
            None
        } else {
            Some(self.tail.join("\n"))
        }
    }
}

/// Emits every line of one stream as it is read, keeping a short tail.
async fn drain(lines: Option<OutputLines>, stream: StreamKind, emitter: &Emitter) -> Drained {
    let mut drained = Drained::default();
    let Some(mut lines) = lines else {
        return drained;
    };
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                drained.push(&text);
                emitter.emit(EventKind::RunLine { stream, text }).await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(stream = stream.as_str(), error = %e, "output stream read failed");
                break;
            }
        }
    }
    drained
}
