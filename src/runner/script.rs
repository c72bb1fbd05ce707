//! # ScriptedRunner: canned processes for tests and constrained environments.
//!
//! Stands in for [`SystemRunner`](super::SystemRunner) where real process
//! execution is unavailable or undesirable. Each known program path maps to
//! a [`Script`] (stdout text, stderr text, exit code); unknown programs get
//! a shell-style `command not found` script with exit code 127.
//!
//! ## Example
//! ```
//! use binvisor::{Script, ScriptedRunner};
//!
//! let runner = ScriptedRunner::new()
//!     .with_script("/bin/tool", Script::ok("tool version 1.2.3\n"));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::RunnerError;

use super::contract::{CommandSpec, OutputLines, ProcessHandle, ProcessRunner};

/// Canned outcome of one scripted execution.
#[derive(Clone, Debug)]
pub struct Script {
    /// Text the process "prints" to stdout.
    pub stdout: String,
    /// Text the process "prints" to stderr.
    pub stderr: String,
    /// Exit code reported by `wait`.
    pub exit_code: i32,
}

impl Script {
    /// A successful execution printing `stdout` and exiting 0.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// A failed execution printing `stderr` and exiting `exit_code`.
    pub fn fail(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// The shell-style outcome for an unknown program: a `command not found`
    /// stderr line and exit code 127.
    pub fn not_found(program: &Path) -> Self {
        Self::fail(
            format!("Error: command not found: {}\n", program.display()),
            127,
        )
    }
}

/// Runner resolving every spawn from a script table.
///
/// Programs without a registered script fall back to the configured default,
/// or to [`Script::not_found`] when there is none. Spawning never fails; use
/// a real runner to exercise spawn errors.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: HashMap<PathBuf, Script>,
    fallback: Option<Script>,
}

impl ScriptedRunner {
    /// Creates a runner with an empty script table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the script played when `program` is spawned.
    pub fn with_script(mut self, program: impl Into<PathBuf>, script: Script) -> Self {
        self.scripts.insert(program.into(), script);
        self
    }

    /// Sets the script played for any unregistered program (instead of the
    /// `command not found` outcome).
    pub fn with_fallback(mut self, script: Script) -> Self {
        self.fallback = Some(script);
        self
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        _working_dir: &Path,
    ) -> Result<Box<dyn ProcessHandle>, RunnerError> {
        let script = self
            .scripts
            .get(&command.program)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| Script::not_found(&command.program));

        Ok(Box::new(ScriptedProcess {
            stdout: Some(OutputLines::new(std::io::Cursor::new(
                script.stdout.into_bytes(),
            ))),
            stderr: Some(OutputLines::new(std::io::Cursor::new(
                script.stderr.into_bytes(),
            ))),
            exit_code: script.exit_code,
            killed: false,
        }))
    }
}

struct ScriptedProcess {
    stdout: Option<OutputLines>,
    stderr: Option<OutputLines>,
    exit_code: i32,
    killed: bool,
}

#[async_trait]
impl ProcessHandle for ScriptedProcess {
    fn pid(&self) -> Option<u32> {
        // Scripted processes have no OS identity.
        None
    }

    fn take_stdout(&mut self) -> Option<OutputLines> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<OutputLines> {
        self.stderr.take()
    }

    async fn wait(&mut self) -> Result<i32, RunnerError> {
        if self.killed {
            // SIGKILL convention: 128 + 9.
            return Ok(137);
        }
        Ok(self.exit_code)
    }

    async fn terminate(&mut self) -> Result<(), RunnerError> {
        self.killed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_the_registered_script() {
        let runner =
            ScriptedRunner::new().with_script("/bin/tool", Script::ok("tool version 1.2.3\n"));
        let spec = CommandSpec::new("/bin/tool").with_args(["--version"]);

        let mut handle = runner.run(&spec, Path::new("/tmp")).await.unwrap();
        let mut stdout = handle.take_stdout().unwrap();
        assert_eq!(
            stdout.next_line().await.unwrap().as_deref(),
            Some("tool version 1.2.3")
        );
        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_program_is_command_not_found() {
        let runner = ScriptedRunner::new();
        let spec = CommandSpec::new("/bin/unknown_command");

        let mut handle = runner.run(&spec, Path::new("/tmp")).await.unwrap();
        let mut stderr = handle.take_stderr().unwrap();
        assert_eq!(
            stderr.next_line().await.unwrap().as_deref(),
            Some("Error: command not found: /bin/unknown_command")
        );
        assert_eq!(handle.wait().await.unwrap(), 127);
    }

    #[tokio::test]
    async fn fallback_overrides_not_found() {
        let runner = ScriptedRunner::new().with_fallback(Script::ok("anything\n"));
        let spec = CommandSpec::new("/whatever");

        let mut handle = runner.run(&spec, Path::new("/tmp")).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn terminate_flips_the_exit_code() {
        let runner = ScriptedRunner::new().with_fallback(Script::ok(""));
        let spec = CommandSpec::new("/whatever");

        let mut handle = runner.run(&spec, Path::new("/tmp")).await.unwrap();
        handle.terminate().await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), 137);
    }
}
