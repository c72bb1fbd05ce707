//! Error types used by the agents and the process runner.
//!
//! This module defines three error enums:
//!
//! - [`UpdateError`] — failures of the update state machine, one variant per
//!   phase plus cancellation and a catch-all.
//! - [`RunError`] — failures of a supervised run.
//! - [`RunnerError`] — failures of the process-runner seam, where a spawn
//!   failure is distinct from anything the child did after starting.
//!
//! Each agent error exposes `as_label()`, a short stable snake_case reason
//! from a closed set. The label is what failure events carry on the wire;
//! `Display` provides the human-readable detail next to it.

use thiserror::Error;

/// # Errors produced by the update state machine.
///
/// One variant per phase that can fail. `as_label()` maps each variant onto
/// the closed reason set `fetch_failed`, `verify_failed`, `extract_failed`,
/// `sanity_failed`, `swap_failed`, `unknown_error`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The update artifact could not be obtained from its source.
    #[error("fetch failed: {detail}")]
    Fetch {
        /// Underlying failure description.
        detail: String,
    },

    /// The fetched artifact failed integrity/authenticity verification.
    #[error("verification failed: {detail}")]
    Verify {
        /// Underlying failure description.
        detail: String,
    },

    /// The artifact could not be unpacked into the staging directory.
    #[error("extraction failed: {detail}")]
    Extract {
        /// Underlying failure description.
        detail: String,
    },

    /// The staged binary did not behave as a valid instance of the managed
    /// binary (or the probe itself failed to run).
    #[error("sanity check failed: {detail}")]
    Sanity {
        /// Underlying failure description.
        detail: String,
    },

    /// Replacing the live artifact failed; rollback was attempted if the
    /// live path had already been displaced.
    #[error("swap failed: {detail}")]
    Swap {
        /// Underlying failure description.
        detail: String,
    },

    /// The invocation was cancelled at a phase boundary before the swap.
    #[error("update cancelled before {phase}")]
    Canceled {
        /// Name of the phase that was about to start.
        phase: &'static str,
    },

    /// Any fault outside the per-phase taxonomy.
    #[error("unexpected failure: {detail}")]
    Unknown {
        /// Underlying failure description.
        detail: String,
    },
}

impl UpdateError {
    /// Returns the stable snake_case reason carried by `UpdateFailed` events.
    ///
    /// Cancellation has no entry in the closed reason set and reports as
    /// `unknown_error`; the `Display` detail disambiguates.
    pub fn as_label(&self) -> &'static str {
        match self {
            UpdateError::Fetch { .. } => "fetch_failed",
            UpdateError::Verify { .. } => "verify_failed",
            UpdateError::Extract { .. } => "extract_failed",
            UpdateError::Sanity { .. } => "sanity_failed",
            UpdateError::Swap { .. } => "swap_failed",
            UpdateError::Canceled { .. } => "unknown_error",
            UpdateError::Unknown { .. } => "unknown_error",
        }
    }

    /// True if the invocation ended because its token was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, UpdateError::Canceled { .. })
    }
}

/// # Errors produced by a supervised run.
///
/// `as_label()` maps onto the closed reason set `spawn_failed`,
/// `process_failed`, `unknown_error`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The binary could not be located or spawned at all.
    #[error("failed to spawn process: {detail}")]
    Spawn {
        /// Underlying failure description.
        detail: String,
    },

    /// The process started but exited with a non-zero code.
    #[error("process exited with code {code}")]
    ProcessFailed {
        /// The non-zero exit code.
        code: i32,
    },

    /// The process was terminated because the caller cancelled the run.
    #[error("process terminated by caller")]
    Killed,

    /// Any fault outside the taxonomy (for example an I/O error while
    /// awaiting the exit code).
    #[error("unexpected failure: {detail}")]
    Unknown {
        /// Underlying failure description.
        detail: String,
    },
}

impl RunError {
    /// Returns the stable snake_case reason carried by `RunFailed` events.
    ///
    /// A killed process exited abnormally, so cancellation reports as
    /// `process_failed`.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Spawn { .. } => "spawn_failed",
            RunError::ProcessFailed { .. } => "process_failed",
            RunError::Killed => "process_failed",
            RunError::Unknown { .. } => "unknown_error",
        }
    }
}

/// # Errors produced by the process-runner seam.
///
/// Failure to locate/spawn the binary is a different kind from any I/O fault
/// on an already-running child; neither is ever conflated with a non-zero
/// exit code, which the runner reports as a plain value.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The program could not be spawned.
    #[error("failed to spawn {program}: {detail}")]
    Spawn {
        /// Program path as given to the runner.
        program: String,
        /// Underlying failure description.
        detail: String,
    },

    /// An I/O fault on a running child (pipes, wait, kill).
    #[error("i/o failure on child process: {detail}")]
    Io {
        /// Underlying failure description.
        detail: String,
    },
}

impl RunnerError {
    /// True if the program never started.
    pub fn is_spawn(&self) -> bool {
        matches!(self, RunnerError::Spawn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_labels_are_the_closed_set() {
        let cases = [
            (UpdateError::Fetch { detail: "x".into() }, "fetch_failed"),
            (UpdateError::Verify { detail: "x".into() }, "verify_failed"),
            (UpdateError::Extract { detail: "x".into() }, "extract_failed"),
            (UpdateError::Sanity { detail: "x".into() }, "sanity_failed"),
            (UpdateError::Swap { detail: "x".into() }, "swap_failed"),
            (UpdateError::Canceled { phase: "swap" }, "unknown_error"),
            (UpdateError::Unknown { detail: "x".into() }, "unknown_error"),
        ];
        for (err, label) in cases {
            assert_eq!(err.as_label(), label);
        }
    }

    #[test]
    fn run_labels_are_the_closed_set() {
        assert_eq!(RunError::Spawn { detail: "x".into() }.as_label(), "spawn_failed");
        assert_eq!(RunError::ProcessFailed { code: 1 }.as_label(), "process_failed");
        assert_eq!(RunError::Killed.as_label(), "process_failed");
        assert_eq!(RunError::Unknown { detail: "x".into() }.as_label(), "unknown_error");
    }

    #[test]
    fn spawn_is_distinguishable_from_io() {
        let spawn = RunnerError::Spawn {
            program: "/bin/missing".into(),
            detail: "No such file".into(),
        };
        let io = RunnerError::Io { detail: "broken pipe".into() };
        assert!(spawn.is_spawn());
        assert!(!io.is_spawn());
    }

    #[test]
    fn canceled_update_is_detectable() {
        assert!(UpdateError::Canceled { phase: "fetch" }.is_canceled());
        assert!(!UpdateError::Unknown { detail: "x".into() }.is_canceled());
    }
}
