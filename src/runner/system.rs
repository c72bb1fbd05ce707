//! # SystemRunner: real child processes via `tokio::process`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::RunnerError;

use super::contract::{CommandSpec, OutputLines, ProcessHandle, ProcessRunner};

/// Spawns real OS processes with piped stdio.
///
/// - stdin is closed (`null`); stdout and stderr are piped and surfaced as
///   [`OutputLines`].
/// - `env_profile` is not interpreted here — resolving a profile is a
///   deployment concern; substitute the runner to honor it.
/// - Pseudo-terminal requests are served with plain pipes (the contract
///   allows ignoring the flag rather than failing).
/// - Children are killed if the handle is dropped early.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
    ) -> Result<Box<dyn ProcessHandle>, RunnerError> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                program: command.program.display().to_string(),
                detail: e.to_string(),
            })?;

        Ok(Box::new(SystemProcess { child }))
    }
}

/// Handle over one spawned child.
struct SystemProcess {
    child: Child,
}

#[async_trait]
impl ProcessHandle for SystemProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_stdout(&mut self) -> Option<OutputLines> {
        self.child.stdout.take().map(OutputLines::new)
    }

    fn take_stderr(&mut self) -> Option<OutputLines> {
        self.child.stderr.take().map(OutputLines::new)
    }

    async fn wait(&mut self) -> Result<i32, RunnerError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RunnerError::Io { detail: e.to_string() })?;
        Ok(exit_code(&status))
    }

    async fn terminate(&mut self) -> Result<(), RunnerError> {
        match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already exited: termination is idempotent.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(RunnerError::Io { detail: e.to_string() }),
        }
    }
}

/// Maps an exit status to a code; signal deaths become `128 + signal`.
#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp() -> std::path::PathBuf {
        std::env::temp_dir()
    }

    #[tokio::test]
    async fn runs_a_process_and_reads_stdout() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("/bin/sh").with_args(["-c", "echo hello"]);

        let mut handle = runner.run(&spec, &tmp()).await.unwrap();
        assert!(handle.pid().is_some());

        let mut stdout = handle.take_stdout().unwrap();
        assert_eq!(stdout.next_line().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(stdout.next_line().await.unwrap(), None);

        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stderr_is_an_independent_stream() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("/bin/sh").with_args(["-c", "echo oops >&2; exit 3"]);

        let mut handle = runner.run(&spec, &tmp()).await.unwrap();
        let mut stderr = handle.take_stderr().unwrap();
        assert_eq!(stderr.next_line().await.unwrap().as_deref(), Some("oops"));

        assert_eq!(handle.wait().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn spawn_failure_is_a_distinct_error() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("/bin/definitely-not-a-binary-xyz");

        let err = runner.run(&spec, &tmp()).await.err().unwrap();
        assert!(err.is_spawn());
    }

    #[tokio::test]
    async fn terminate_kills_a_long_running_child() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("/bin/sh").with_args(["-c", "sleep 30"]);

        let mut handle = runner.run(&spec, &tmp()).await.unwrap();
        handle.terminate().await.unwrap();

        let code = handle.wait().await.unwrap();
        assert_ne!(code, 0);
    }

    #[tokio::test]
    async fn streams_can_only_be_taken_once() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("/bin/sh").with_args(["-c", "true"]);

        let mut handle = runner.run(&spec, &tmp()).await.unwrap();
        assert!(handle.take_stdout().is_some());
        assert!(handle.take_stdout().is_none());
        handle.wait().await.unwrap();
    }
}
