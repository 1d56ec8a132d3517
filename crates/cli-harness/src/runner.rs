use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;
use tracing::debug;

use crate::error::HarnessError;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitOutcome {
    Code(i32),
    /// Killed by this signal number (Unix only).
    Signal(i32),
}

impl ExitOutcome {
    fn from_status(status: &ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signal(signal);
            }
        }
        ExitOutcome::Code(-1)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Code(code) => write!(f, "exit code {}", code),
            ExitOutcome::Signal(signal) => write!(f, "signal {}", signal),
        }
    }
}

/// Captured result of one command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// stdout and stderr, interleaved as the process wrote them.
    pub output: String,
    pub status: ExitOutcome,
    pub duration_ms: f64,
}

impl CommandResult {
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ExitOutcome::Code(code) => Some(code),
            ExitOutcome::Signal(_) => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self.status {
            ExitOutcome::Signal(signal) => Some(signal),
            ExitOutcome::Code(_) => None,
        }
    }

    pub fn success(&self) -> bool {
        self.status == ExitOutcome::Code(0)
    }
}

/// Runs shell command lines and captures their merged output.
///
/// The runner does not change directories or the environment itself; use
/// it inside a scope so the child inherits the constrained state.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    shell: String,
    flag: String,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner {
    #[cfg(not(windows))]
    pub fn new() -> Self {
        Self::with_shell("sh", "-c")
    }

    #[cfg(windows)]
    pub fn new() -> Self {
        Self::with_shell("cmd", "/C")
    }

    pub fn with_shell(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            shell: program.into(),
            flag: flag.into(),
        }
    }

    /// Run `command_line` to completion.
    ///
    /// A nonzero exit is a normal result. Only failing to start or wait for
    /// the shell is an error.
    pub fn run(&self, command_line: &str) -> Result<CommandResult, HarnessError> {
        debug!("Running `{}`", truncate(command_line, 512));
        let spawn_err = |source: io::Error| HarnessError::CommandSpawnFailed {
            command: command_line.to_string(),
            source,
        };

        let (mut reader, writer) = io::pipe().map_err(spawn_err)?;
        let mut command = Command::new(&self.shell);
        command.arg(&self.flag);
        push_command_line(&mut command, command_line);
        command
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_err)?)
            .stderr(writer);

        let start = Instant::now();
        let mut child = command.spawn().map_err(spawn_err)?;
        // The command still owns the write ends; drop them so the read
        // below sees EOF once the child exits.
        drop(command);

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).map_err(spawn_err)?;
        let status = child.wait().map_err(spawn_err)?;
        let duration = start.elapsed();

        let result = CommandResult {
            output: String::from_utf8_lossy(&raw).into_owned(),
            status: ExitOutcome::from_status(&status),
            duration_ms: duration.as_secs_f64() * 1000.0,
        };
        debug!(
            "`{}` finished with {} in {:.1}ms",
            truncate(command_line, 128),
            result.status,
            result.duration_ms
        );
        Ok(result)
    }

    /// Quote each argument and run `cmd args...` as one command line.
    pub fn run_args<S: AsRef<str>>(
        &self,
        cmd: &str,
        args: &[S],
    ) -> Result<CommandResult, HarnessError> {
        let mut line = cmd.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&shell_escape(arg.as_ref()));
        }
        self.run(&line)
    }
}

#[cfg(windows)]
fn push_command_line(command: &mut Command, line: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(line);
}

#[cfg(not(windows))]
fn push_command_line(command: &mut Command, line: &str) {
    command.arg(line);
}

/// Quote `arg` for the platform shell, leaving plain words untouched.
pub fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return if cfg!(windows) { "\"\"" } else { "''" }.to_string();
    }
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        return arg.to_string();
    }
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

pub(crate) fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut truncated = text[..end].to_string();
    truncated.push_str("… (truncated)");
    truncated
}
