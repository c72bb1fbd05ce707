//! # LogWriter — renders bus events through `tracing`.
//!
//! A minimal subscriber for demos, tests, and deployments that just want the
//! event flow in their logs. One line per event:
//!
//! ```text
//! [update-started] id=… source="/srv/drop/tool"
//! [update-progress] id=… phase=fetch bytes=1048576
//! [run-line] id=… stream=stdout text="tool version 1.2.3"
//! [run-failed] id=… reason=process_failed
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::subscribe::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let id = e.id;
        match &e.kind {
            EventKind::UpdateStarted { source } => {
                tracing::info!(%id, source = %source, "[update-started]");
            }
            EventKind::UpdateProgress { phase, bytes_done, .. } => {
                tracing::info!(%id, phase = phase.as_str(), bytes = *bytes_done, "[update-progress]");
            }
            EventKind::UpdateExtracted { temp_path, entries } => {
                tracing::info!(%id, path = %temp_path.display(), entries = entries.len(), "[update-extracted]");
            }
            EventKind::UpdateSanityCheck { success, version_output, .. } => {
                tracing::info!(%id, success = *success, version = ?version_output, "[update-sanity-check]");
            }
            EventKind::UpdateCompleted { installed_path, version, .. } => {
                tracing::info!(%id, path = %installed_path.display(), version = %version, "[update-completed]");
            }
            EventKind::UpdateFailed { reason, error_detail } => {
                tracing::warn!(%id, reason = %reason, detail = ?error_detail, "[update-failed]");
            }
            EventKind::RollbackPerformed { restored_path } => {
                tracing::warn!(%id, path = %restored_path.display(), "[rollback-performed]");
            }
            EventKind::RunStarted { pid } => {
                tracing::info!(%id, pid = ?pid, "[run-started]");
            }
            EventKind::RunLine { stream, text } => {
                tracing::info!(%id, stream = stream.as_str(), text = %text, "[run-line]");
            }
            EventKind::RunStatus { exit_code, state } => {
                tracing::info!(%id, code = ?exit_code, state = ?state, "[run-status]");
            }
            EventKind::RunResult { exit_code, duration_ms, .. } => {
                tracing::info!(%id, code = *exit_code, duration_ms = *duration_ms, "[run-result]");
            }
            EventKind::RunFailed { reason, .. } => {
                tracing::warn!(%id, reason = %reason, "[run-failed]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
