//! # Runner contract: command spec, handle, and line streams.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::error::RunnerError;

/// What to execute: program path, arguments, and the opaque environment
/// profile reference.
///
/// The profile name is carried through untouched — resolving it (to
/// environment variables, resource limits, …) is a deployment concern of the
/// runner implementation, never of the orchestration core.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    /// Absolute path of the program to execute.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Opaque environment profile reference (may be ignored by a runner).
    pub env_profile: Option<String>,
}

impl CommandSpec {
    /// Creates a spec with no arguments and no profile.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_profile: None,
        }
    }

    /// Replaces the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches an environment profile reference.
    pub fn with_env_profile(mut self, profile: impl Into<String>) -> Self {
        self.env_profile = Some(profile.into());
        self
    }
}

/// Lazy, line-delimited, finite text stream over one child output pipe.
pub struct OutputLines {
    lines: Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>,
}

impl OutputLines {
    /// Wraps any async byte reader as a line stream.
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let boxed: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: BufReader::new(boxed).lines(),
        }
    }

    /// Reads the next line, without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Spawns commands and yields handles; the only part of the crate aware of
/// an external process abstraction.
#[async_trait]
pub trait ProcessRunner: Send + Sync + 'static {
    /// Spawns `command` with `working_dir` as its working directory.
    ///
    /// Failure to locate or start the program yields
    /// [`RunnerError::Spawn`]; anything the child does after starting is
    /// reported through the handle instead.
    async fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
    ) -> Result<Box<dyn ProcessHandle>, RunnerError>;
}

/// Live (or scripted) child process.
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, when the runner knows one.
    fn pid(&self) -> Option<u32>;

    /// Takes ownership of the stdout line stream. Subsequent calls return `None`.
    fn take_stdout(&mut self) -> Option<OutputLines>;

    /// Takes ownership of the stderr line stream. Subsequent calls return `None`.
    fn take_stderr(&mut self) -> Option<OutputLines>;

    /// Awaits process exit and returns the exit code.
    async fn wait(&mut self) -> Result<i32, RunnerError>;

    /// Kills the process. Idempotent; a second call is a no-op.
    async fn terminate(&mut self) -> Result<(), RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_spec_builder() {
        let spec = CommandSpec::new("/bin/tool")
            .with_args(["--version"])
            .with_env_profile("low-mem");
        assert_eq!(spec.program, PathBuf::from("/bin/tool"));
        assert_eq!(spec.args, vec!["--version".to_string()]);
        assert_eq!(spec.env_profile.as_deref(), Some("low-mem"));
    }

    #[tokio::test]
    async fn output_lines_reads_until_eof() {
        let mut lines = OutputLines::new(std::io::Cursor::new(b"one\ntwo\n".to_vec()));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn output_lines_handles_missing_final_newline() {
        let mut lines = OutputLines::new(std::io::Cursor::new(b"tail".to_vec()));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("tail"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
