//! Command runner abstraction and the runners backing it.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use super::RemoteError;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RemoteError>;
}

/// Command runner that waits for completion and captures output silently.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RemoteError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| RemoteError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runner that forwards child output to the console line by line while
/// capturing it.
///
/// Remote package installs run for minutes; the operator needs to see
/// progress as it happens rather than after the session closes.
#[derive(Clone, Debug, Default)]
pub struct StreamingCommandRunner;

impl CommandRunner for StreamingCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RemoteError> {
        let spawn_err = |message: String| RemoteError::Spawn {
            program: program.to_owned(),
            message,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_err(err.to_string()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_thread = thread::spawn(move || forward_lines(stdout, io::stdout()));
        let stderr_thread = thread::spawn(move || forward_lines(stderr, io::stderr()));

        let status = child.wait().map_err(|err| spawn_err(err.to_string()))?;
        let stdout_text = stdout_thread.join().unwrap_or_default();
        let stderr_text = stderr_thread.join().unwrap_or_default();

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout_text,
            stderr: stderr_text,
        })
    }
}

/// Copies lines from `source` to `sink` as they arrive, returning the
/// captured text.
fn forward_lines(source: Option<impl Read>, mut sink: impl Write) -> String {
    let mut captured = String::new();
    let Some(source) = source else {
        return captured;
    };

    for line in BufReader::new(source).lines() {
        let Ok(line) = line else {
            break;
        };
        writeln!(sink, "{line}").ok();
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}
