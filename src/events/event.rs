//! # Lifecycle events emitted by the update and run agents.
//!
//! [`Event`] is an immutable record of one occurrence. Every event carries
//! the [`InvocationId`] of the invocation that produced it, a process-global
//! monotonic sequence number, a wall-clock timestamp, and an [`EventKind`]
//! payload from a closed set of variants.
//!
//! ## Ordering guarantees
//! Within one invocation the emission order is total and matches causal
//! phase order. Across invocations the interleaving is unspecified; use
//! `seq` to restore a global total order, and `id` to carve out the
//! sub-sequence of a single invocation.
//!
//! ## Wire format
//! Events serialize to flat records. The `type` field names the variant in
//! snake_case, `id`/`seq`/`timestamp` are always present, and the remaining
//! fields are the variant's payload:
//! ```text
//! {"id":"…","seq":7,"timestamp":"2026-…","type":"run_line","stream":"stdout","text":"…"}
//! ```
//! These field names are a compatibility surface for external consumers
//! (log shippers, UIs) and must not change.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier grouping all events of one agent invocation.
///
/// Assigned once when the invocation starts; unique per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Update phase reported by progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePhase {
    Fetch,
    Verify,
    Extract,
    Swap,
}

impl UpdatePhase {
    /// Stable lowercase name, identical to the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatePhase::Fetch => "fetch",
            UpdatePhase::Verify => "verify",
            UpdatePhase::Extract => "extract",
            UpdatePhase::Swap => "swap",
        }
    }
}

/// Which output stream a [`EventKind::RunLine`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// Stable lowercase name, identical to the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Coarse child-process state reported by [`EventKind::RunStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Stopped,
    Killed,
}

/// Closed set of event payloads, grouped by owning agent.
///
/// Serialized with an internal `type` tag naming the variant in snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // === Update family ===
    /// An update invocation began for the given source reference.
    UpdateStarted { source: String },

    /// Byte-level progress within one update phase.
    UpdateProgress {
        phase: UpdatePhase,
        bytes_done: u64,
        bytes_total: Option<u64>,
        percent: Option<f32>,
    },

    /// The artifact was unpacked into the staging directory.
    UpdateExtracted {
        temp_path: PathBuf,
        /// Unpacked entry names, in staging order.
        entries: Vec<String>,
    },

    /// Outcome of probing the staged binary before activation.
    UpdateSanityCheck {
        success: bool,
        version_output: Option<String>,
        notes: Option<String>,
    },

    /// The staged artifact is live; terminal success event.
    UpdateCompleted {
        installed_path: PathBuf,
        checksum: Option<String>,
        version: String,
    },

    /// Terminal failure event; emitted exactly once per failed invocation.
    UpdateFailed {
        /// Stable reason from the closed set (see [`crate::UpdateError::as_label`]).
        reason: String,
        error_detail: Option<String>,
    },

    /// A failed swap restored the previously live artifact.
    RollbackPerformed { restored_path: PathBuf },

    // === Run family ===
    /// A run invocation began; pid is absent until the runner reports one.
    RunStarted { pid: Option<u32> },

    /// One line of child output, emitted as soon as it is read.
    RunLine { stream: StreamKind, text: String },

    /// Coarse state transition of the child process.
    RunStatus {
        exit_code: Option<i32>,
        state: RunState,
    },

    /// Terminal success event for a run (exit code zero).
    RunResult {
        exit_code: i32,
        duration_ms: u64,
        stdout_summary: Option<String>,
        stderr_summary: Option<String>,
        logs_path: Option<PathBuf>,
    },

    /// Terminal failure event for a run.
    RunFailed {
        /// Stable reason from the closed set (see [`crate::RunError::as_label`]).
        reason: String,
        stderr_sample: Option<String>,
    },
}

/// One immutable occurrence on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Correlation id shared by all events of one invocation.
    pub id: InvocationId,
    /// Process-global, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (RFC 3339 on the wire).
    #[serde(rename = "timestamp")]
    pub at: DateTime<Utc>,
    /// Variant payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Creates an event with the current timestamp and next sequence number.
    pub fn new(id: InvocationId, kind: EventKind) -> Self {
        Self {
            id,
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            kind,
        }
    }

    /// True for the two terminal run variants.
    pub fn is_run_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::RunResult { .. } | EventKind::RunFailed { .. }
        )
    }

    /// True for the two terminal update variants.
    pub fn is_update_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::UpdateCompleted { .. } | EventKind::UpdateFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let id = InvocationId::new();
        let a = Event::new(id, EventKind::RunStarted { pid: None });
        let b = Event::new(id, EventKind::RunStarted { pid: None });
        assert!(b.seq > a.seq);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn wire_format_uses_type_discriminator_and_snake_case_fields() {
        let ev = Event::new(
            InvocationId::new(),
            EventKind::RunLine {
                stream: StreamKind::Stdout,
                text: "tool version 1.2.3".to_string(),
            },
        );
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "run_line");
        assert_eq!(v["stream"], "stdout");
        assert_eq!(v["text"], "tool version 1.2.3");
        assert!(v["id"].is_string());
        assert!(v["timestamp"].is_string());
        assert!(v["seq"].is_u64());
    }

    #[test]
    fn update_events_serialize_with_stable_names() {
        let ev = Event::new(
            InvocationId::new(),
            EventKind::UpdateProgress {
                phase: UpdatePhase::Fetch,
                bytes_done: 42,
                bytes_total: Some(42),
                percent: Some(100.0),
            },
        );
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "update_progress");
        assert_eq!(v["phase"], "fetch");
        assert_eq!(v["bytes_done"], 42);
        assert_eq!(v["bytes_total"], 42);

        let ev = Event::new(
            InvocationId::new(),
            EventKind::UpdateSanityCheck {
                success: true,
                version_output: Some("9.9.9".to_string()),
                notes: None,
            },
        );
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "update_sanity_check");
        assert_eq!(v["success"], true);
        assert_eq!(v["version_output"], "9.9.9");
    }

    #[test]
    fn events_round_trip_through_json() {
        let ev = Event::new(
            InvocationId::new(),
            EventKind::RunResult {
                exit_code: 0,
                duration_ms: 12,
                stdout_summary: Some("done".to_string()),
                stderr_summary: None,
                logs_path: None,
            },
        );
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, ev.id);
        assert_eq!(back.seq, ev.seq);
        assert_eq!(back.kind, ev.kind);
    }

    #[test]
    fn terminal_predicates() {
        let id = InvocationId::new();
        assert!(Event::new(
            id,
            EventKind::RunFailed { reason: "process_failed".into(), stderr_sample: None }
        )
        .is_run_terminal());
        assert!(Event::new(
            id,
            EventKind::UpdateCompleted {
                installed_path: PathBuf::from("/x"),
                checksum: None,
                version: "1".into()
            }
        )
        .is_update_terminal());
        assert!(!Event::new(id, EventKind::RunStarted { pid: None }).is_run_terminal());
    }
}
