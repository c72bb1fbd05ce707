//! # UpdateAgent: fetch, verify, extract, probe, swap, record.
//!
//! Drives one update-to-completion, guaranteeing that the live artifact at
//! `<current_root>/<artifact_name>` is only ever observed in a fully-valid
//! state: it is replaced exclusively by a filesystem rename of a staged
//! artifact that already passed the sanity probe, and restored from backup
//! if that rename fails halfway.
//!
//! ## State machine
//! ```text
//! Fetching → Verifying → Extracting → SanityChecking → Swapping → Recording
//!     │           │           │              │             │          │
//!     ▼           ▼           ▼              ▼             ▼          ▼
//! fetch_failed verify_   extract_      sanity_failed   swap_failed  UpdateCompleted
//!              failed    failed        (live path      (rollback    + Success
//!                                      untouched)      if displaced)
//! ```
//!
//! ## Rules
//! - Exactly one `UpdateFailed` per failed invocation; `RollbackPerformed`
//!   is emitted only when a displaced live artifact was restored.
//! - The staging directory `<temp_root>/<invocation-id>/` is removed on
//!   every exit path; cleanup failures are logged, never escalated.
//! - Invocations targeting the same live path are serialized by an internal
//!   per-target lock; callers in other processes still need an external
//!   lock.
//! - Cancellation is honored at phase boundaries before the swap. The swap
//!   itself is a point of no return: once it starts the token is
//!   deliberately not consulted again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::UpdateError;
use crate::events::{Bus, Event, EventKind, InvocationId, UpdatePhase};

use super::probe::{ProbeReport, SanityProbe};
use super::source::UpdateSource;
use super::verify::Verifier;

/// Terminal outcome of one `run_update` invocation.
#[derive(Debug)]
pub enum UpdateResult {
    /// The staged artifact is live.
    Success {
        /// Version reported by the sanity probe.
        version: String,
    },
    /// The update failed; the live artifact is exactly as it was before.
    Failure {
        /// The classified failure.
        error: UpdateError,
    },
}

impl UpdateResult {
    /// True for [`UpdateResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateResult::Success { .. })
    }

    /// Installed version, when successful.
    pub fn version(&self) -> Option<&str> {
        match self {
            UpdateResult::Success { version } => Some(version),
            UpdateResult::Failure { .. } => None,
        }
    }
}

/// Per-live-path locks serializing concurrent updates within this agent.
#[derive(Default)]
struct TargetLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    async fn acquire(&self, target: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(
                map.entry(target.to_path_buf())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// Drives updates of the managed binary.
///
/// The fetch/verify/probe capabilities are seams; swap and cleanup are owned
/// here. Invocations may run concurrently, each under its own
/// [`InvocationId`]; those sharing a live path are serialized.
pub struct UpdateAgent {
    cfg: Config,
    bus: Bus,
    source: Arc<dyn UpdateSource>,
    verifier: Arc<dyn Verifier>,
    probe: Arc<dyn SanityProbe>,
    locks: TargetLocks,
}

impl UpdateAgent {
    /// Creates an agent with the given capabilities.
    pub fn new(
        cfg: Config,
        bus: Bus,
        source: Arc<dyn UpdateSource>,
        verifier: Arc<dyn Verifier>,
        probe: Arc<dyn SanityProbe>,
    ) -> Self {
        Self {
            cfg,
            bus,
            source,
            verifier,
            probe,
            locks: TargetLocks::default(),
        }
    }

    /// Runs one update from `source` to a terminal state.
    ///
    /// Returns synchronously (in the async sense) once the state machine is
    /// terminal; all progress is observable on the bus. On failure the live
    /// artifact is exactly as it was before the invocation.
    pub async fn run_update(&self, source: &str, cancel: CancellationToken) -> UpdateResult {
        let id = InvocationId::new();
        let current = self.cfg.current_path();
        let staging = self.cfg.temp_root.join(id.to_string());

        let _target = self.locks.acquire(&current).await;

        self.publish(
            id,
            EventKind::UpdateStarted {
                source: source.to_string(),
            },
        )
        .await;

        let outcome = self.drive(id, source, &staging, &current, &cancel).await;
        remove_staging(&staging).await;

        match outcome {
            Ok(version) => UpdateResult::Success { version },
            Err(error) => {
                self.publish(
                    id,
                    EventKind::UpdateFailed {
                        reason: error.as_label().to_string(),
                        error_detail: Some(error.to_string()),
                    },
                )
                .await;
                UpdateResult::Failure { error }
            }
        }
    }

    /// Advances the state machine to `UpdateCompleted` or the first error.
    async fn drive(
        &self,
        id: InvocationId,
        source: &str,
        staging: &Path,
        current: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, UpdateError> {
        check_cancel(cancel, "fetch")?;
        fs::create_dir_all(staging)
            .await
            .map_err(|e| UpdateError::Fetch {
                detail: format!("failed to create staging directory: {e}"),
            })?;
        let fetched = self.source.fetch(source, staging).await?;
        self.progress(id, UpdatePhase::Fetch, fetched.bytes).await;

        check_cancel(cancel, "verify")?;
        let checksum = self.verifier.verify(&fetched.path).await?;
        self.progress(id, UpdatePhase::Verify, fetched.bytes).await;

        check_cancel(cancel, "extract")?;
        let entries = list_entries(staging).await?;
        self.publish(
            id,
            EventKind::UpdateExtracted {
                temp_path: staging.to_path_buf(),
                entries,
            },
        )
        .await;

        check_cancel(cancel, "sanity check")?;
        let report = match self.probe.probe(&fetched.path).await {
            Ok(report) => report,
            Err(e) => ProbeReport::failed(e.to_string()),
        };
        self.publish(
            id,
            EventKind::UpdateSanityCheck {
                success: report.success,
                version_output: report.version_output.clone(),
                notes: report.notes.clone(),
            },
        )
        .await;
        if !report.success {
            return Err(UpdateError::Sanity {
                detail: report
                    .notes
                    .unwrap_or_else(|| "probe rejected the staged binary".to_string()),
            });
        }
        let version = report
            .version_output
            .unwrap_or_else(|| "unknown".to_string());

        check_cancel(cancel, "swap")?;
        // Point of no return: no cancellation checks past this line.
        self.swap(id, &fetched.path, current).await?;

        self.publish(
            id,
            EventKind::UpdateCompleted {
                installed_path: current.to_path_buf(),
                checksum,
                version: version.clone(),
            },
        )
        .await;
        Ok(version)
    }

    /// Atomically replaces the live artifact with the staged one.
    ///
    /// The previous artifact is displaced to a backup name first; if the
    /// activating rename then fails, the backup is renamed back and
    /// `RollbackPerformed` is published.
    async fn swap(
        &self,
        id: InvocationId,
        staged: &Path,
        current: &Path,
    ) -> Result<(), UpdateError> {
        if let Some(parent) = current.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdateError::Swap {
                    detail: format!("failed to create current root: {e}"),
                })?;
        }

        let backup = backup_path(current, id);
        let displaced = match fs::try_exists(current).await {
            Ok(true) => {
                fs::rename(current, &backup)
                    .await
                    .map_err(|e| UpdateError::Swap {
                        detail: format!("failed to displace previous artifact: {e}"),
                    })?;
                true
            }
            Ok(false) => false,
            Err(e) => {
                return Err(UpdateError::Swap {
                    detail: format!("failed to inspect live path: {e}"),
                })
            }
        };

        if let Err(e) = fs::rename(staged, current).await {
            if displaced {
                match fs::rename(&backup, current).await {
                    Ok(()) => {
                        self.publish(
                            id,
                            EventKind::RollbackPerformed {
                                restored_path: current.to_path_buf(),
                            },
                        )
                        .await;
                    }
                    Err(restore) => {
                        tracing::warn!(
                            backup = %backup.display(),
                            error = %restore,
                            "rollback failed; previous artifact left at backup path"
                        );
                    }
                }
            }
            return Err(UpdateError::Swap {
                detail: format!("failed to activate staged artifact: {e}"),
            });
        }

        if displaced {
            if let Err(e) = fs::remove_file(&backup).await {
                tracing::warn!(backup = %backup.display(), error = %e, "failed to remove backup");
            }
        }

        let bytes = fs::metadata(current).await.map(|m| m.len()).unwrap_or(0);
        self.progress(id, UpdatePhase::Swap, bytes).await;
        Ok(())
    }

    async fn progress(&self, id: InvocationId, phase: UpdatePhase, bytes: u64) {
        self.publish(
            id,
            EventKind::UpdateProgress {
                phase,
                bytes_done: bytes,
                bytes_total: Some(bytes),
                percent: Some(100.0),
            },
        )
        .await;
    }

    async fn publish(&self, id: InvocationId, kind: EventKind) {
        self.bus.publish(Event::new(id, kind)).await;
    }
}

fn check_cancel(cancel: &CancellationToken, phase: &'static str) -> Result<(), UpdateError> {
    if cancel.is_cancelled() {
        Err(UpdateError::Canceled { phase })
    } else {
        Ok(())
    }
}

/// Sibling name the previous artifact is displaced to during a swap.
fn backup_path(current: &Path, id: InvocationId) -> PathBuf {
    let name = current
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    current.with_file_name(format!("{name}.prev-{id}"))
}

/// Ordered entry names of the staging directory.
async fn list_entries(staging: &Path) -> Result<Vec<String>, UpdateError> {
    let mut dir = fs::read_dir(staging).await.map_err(|e| UpdateError::Extract {
        detail: format!("failed to read staging directory: {e}"),
    })?;
    let mut entries = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(|e| UpdateError::Extract {
        detail: format!("failed to enumerate staging directory: {e}"),
    })? {
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }
    entries.sort();
    Ok(entries)
}

/// Best-effort recursive removal of the staging directory.
async fn remove_staging(staging: &Path) {
    if let Err(e) = fs::remove_dir_all(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %staging.display(),
                error = %e,
                "failed to remove staging directory"
            );
        }
    }
}
