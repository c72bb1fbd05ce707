//! # Sanity probing: does the staged binary behave?
//!
//! Before activation, the update agent asks a [`SanityProbe`] whether the
//! staged artifact is a valid instance of the managed binary. The bundled
//! [`VersionProbe`] executes the binary with a version argument through the
//! [`ProcessRunner`](crate::ProcessRunner) seam and matches the output
//! against an expected token. Deployments needing a richer health check
//! substitute the trait.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::UpdateError;
use crate::runner::{CommandSpec, OutputLines, ProcessHandle, ProcessRunner};

/// Outcome of probing one staged binary.
#[derive(Clone, Debug)]
pub struct ProbeReport {
    /// Whether the artifact is acceptable for activation.
    pub success: bool,
    /// Extracted version, when the probe could determine one.
    pub version_output: Option<String>,
    /// Free-form diagnostics.
    pub notes: Option<String>,
}

impl ProbeReport {
    /// A passing report carrying the extracted version.
    pub fn passed(version: impl Into<String>) -> Self {
        Self {
            success: true,
            version_output: Some(version.into()),
            notes: None,
        }
    }

    /// A failing report with a diagnostic note.
    pub fn failed(notes: impl Into<String>) -> Self {
        Self {
            success: false,
            version_output: None,
            notes: Some(notes.into()),
        }
    }
}

/// Probes a staged binary before it may replace the live one.
#[async_trait]
pub trait SanityProbe: Send + Sync + 'static {
    /// Probes `binary`.
    ///
    /// `Err` means the probe itself could not run; both that and a report
    /// with `success == false` abort the update as `sanity_failed`.
    async fn probe(&self, binary: &Path) -> Result<ProbeReport, UpdateError>;
}

/// Executes `<binary> --version` and matches the output.
///
/// The probe passes when some stdout line contains the expected token; the
/// trailing whitespace-separated word of that line is reported as the
/// version (`"tool version 9.9.9"` → `"9.9.9"`). A non-zero exit, missing
/// token, or timeout fails the probe.
pub struct VersionProbe {
    runner: Arc<dyn ProcessRunner>,
    expect: String,
    version_arg: String,
    timeout: Duration,
}

impl VersionProbe {
    /// Creates a probe expecting `expect` in the version output.
    ///
    /// Defaults: `--version` as the argument, 10s timeout.
    pub fn new(runner: Arc<dyn ProcessRunner>, expect: impl Into<String>) -> Self {
        Self {
            runner,
            expect: expect.into(),
            version_arg: "--version".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the probe argument.
    pub fn with_version_arg(mut self, arg: impl Into<String>) -> Self {
        self.version_arg = arg.into();
        self
    }

    /// Overrides the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn execute(&self, binary: &Path) -> Result<ProbeReport, UpdateError> {
        let command = CommandSpec::new(binary).with_args([self.version_arg.clone()]);
        let working_dir = binary
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let mut handle = self
            .runner
            .run(&command, &working_dir)
            .await
            .map_err(|e| UpdateError::Sanity {
                detail: format!("probe failed to run: {e}"),
            })?;

        // Drain both pipes so a chatty probe cannot stall on a full buffer.
        let stdout = handle.take_stdout();
        let stderr = handle.take_stderr();
        let (out_lines, _) = tokio::join!(collect_lines(stdout), collect_lines(stderr));

        let code = handle.wait().await.map_err(|e| UpdateError::Sanity {
            detail: format!("probe wait failed: {e}"),
        })?;
        if code != 0 {
            return Ok(ProbeReport::failed(format!("probe exited with code {code}")));
        }

        match out_lines.iter().find(|line| line.contains(&self.expect)) {
            Some(line) => {
                let version = line.split_whitespace().last().unwrap_or_default();
                Ok(ProbeReport::passed(version))
            }
            None => Ok(ProbeReport::failed(format!(
                "probe output did not contain {:?}",
                self.expect
            ))),
        }
    }
}

#[async_trait]
impl SanityProbe for VersionProbe {
    async fn probe(&self, binary: &Path) -> Result<ProbeReport, UpdateError> {
        match tokio::time::timeout(self.timeout, self.execute(binary)).await {
            Ok(result) => result,
            Err(_) => Err(UpdateError::Sanity {
                detail: format!("probe timed out after {:?}", self.timeout),
            }),
        }
    }
}

async fn collect_lines(lines: Option<OutputLines>) -> Vec<String> {
    let mut collected = Vec::new();
    let Some(mut lines) = lines else {
        return collected;
    };
    while let Ok(Some(line)) = lines.next_line().await {
        collected.push(line);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Script, ScriptedRunner};

    fn probe_with(script: Script, expect: &str) -> VersionProbe {
        VersionProbe::new(
            Arc::new(ScriptedRunner::new().with_fallback(script)),
            expect,
        )
    }

    #[tokio::test]
    async fn extracts_the_trailing_version() {
        let probe = probe_with(Script::ok("tool version 1.2.3\n"), "tool version");
        let report = probe.probe(Path::new("/staged/tool")).await.unwrap();
        assert!(report.success);
        assert_eq!(report.version_output.as_deref(), Some("1.2.3"));
    }

    #[tokio::test]
    async fn rejects_unexpected_output() {
        let probe = probe_with(Script::ok("something else entirely\n"), "tool version");
        let report = probe.probe(Path::new("/staged/tool")).await.unwrap();
        assert!(!report.success);
        assert!(report.notes.unwrap().contains("did not contain"));
    }

    #[tokio::test]
    async fn rejects_nonzero_probe_exit() {
        let probe = probe_with(Script::fail("segfault\n", 139), "tool version");
        let report = probe.probe(Path::new("/staged/tool")).await.unwrap();
        assert!(!report.success);
        assert!(report.notes.unwrap().contains("code 139"));
    }

    #[tokio::test]
    async fn matches_on_any_stdout_line() {
        let probe = probe_with(
            Script::ok("copyright notice\ntool version 4.5.6\n"),
            "tool version",
        );
        let report = probe.probe(Path::new("/staged/tool")).await.unwrap();
        assert!(report.success);
        assert_eq!(report.version_output.as_deref(), Some("4.5.6"));
    }
}
