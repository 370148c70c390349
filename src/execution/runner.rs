//! Command runner - spawns step commands as shell subprocesses

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Number of trailing output lines kept for failure reports
pub const OUTPUT_TAIL_LINES: usize = 20;

/// Error types for command execution
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory {0} does not exist")]
    MissingWorkdir(PathBuf),
}

/// A command to run for a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Shell command line
    pub command: String,

    /// Working directory
    pub workdir: PathBuf,

    /// Full environment additions for the child
    pub env: BTreeMap<String, String>,
}

/// Which stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives child output as it is produced
pub trait OutputCallback: Send + Sync {
    fn on_line(&self, stream: OutputStream, line: &str);
}

/// Result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,

    /// Last lines of combined output
    pub tail: Vec<String>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    async fn run(
        &self,
        spec: &CommandSpec,
        output: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutcome, RunnerError>;
}

/// Runs commands through the platform shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    shell_flag: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>, shell_flag: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            shell_flag: shell_flag.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }
}

/// Bounded buffer of the most recent lines
struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_vec(self) -> Vec<String> {
        self.lines.into_iter().collect()
    }
}

/// Drain one line from a read buffer. Invalid UTF-8 is replaced, never rejected.
fn take_line(buf: &mut Vec<u8>) -> String {
    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
    }
    if buf[..end].ends_with(b"\r") {
        end -= 1;
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.clear();
    line
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        output: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutcome, RunnerError> {
        if !spec.workdir.is_dir() {
            return Err(RunnerError::MissingWorkdir(spec.workdir.clone()));
        }

        debug!("Spawning `{}` in {}", spec.command, spec.workdir.display());

        let mut child = Command::new(&self.shell)
            .arg(&self.shell_flag)
            .arg(&spec.command)
            .current_dir(&spec.workdir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: spec.command.clone(),
                source,
            })?;

        let io_error = |source| RunnerError::Io {
            command: spec.command.clone(),
            source,
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            io_error(std::io::Error::other("stdout was not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            io_error(std::io::Error::other("stderr was not captured"))
        })?;

        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut tail = OutputTail::new(OUTPUT_TAIL_LINES);

        // Partial reads stay in the per-stream buffer when the other branch wins
        while stdout_open || stderr_open {
            let (stream, read) = tokio::select! {
                read = stdout.read_until(b'\n', &mut stdout_buf), if stdout_open => (OutputStream::Stdout, read),
                read = stderr.read_until(b'\n', &mut stderr_buf), if stderr_open => (OutputStream::Stderr, read),
            };

            let (buf, open) = match stream {
                OutputStream::Stdout => (&mut stdout_buf, &mut stdout_open),
                OutputStream::Stderr => (&mut stderr_buf, &mut stderr_open),
            };

            if read.map_err(io_error)? == 0 {
                *open = false;
            }
            if buf.is_empty() {
                continue;
            }

            let line = take_line(buf);
            if let Some(cb) = output {
                cb.on_line(stream, &line);
            }
            tail.push(line);
        }

        let status = child.wait().await.map_err(io_error)?;
        let exit_code = status.code();
        if exit_code.is_none() {
            warn!("`{}` was terminated by a signal", spec.command);
        }
        debug!("`{}` exited with {:?}", spec.command, exit_code);

        Ok(CommandOutcome {
            exit_code,
            tail: tail.into_vec(),
        })
    }
}
