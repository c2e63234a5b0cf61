//! Subprocess boundary used by the database manager.
//!
//! [`ProcessRunner`] abstracts how commands are executed so the startup
//! protocol can be driven by scripted fakes in tests. The production
//! implementation, [`SystemProcessRunner`], uses `std::process` for spawning
//! and `nix` for signalling arbitrary pids.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::debug;

use crate::DB_TARGET;
use crate::error::DatabaseError;

/// Description of a command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
    stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    /// Starts a command description for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends a `--name=value` option.
    #[must_use]
    pub fn option(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        let mut flag = OsString::from(format!("--{name}="));
        flag.push(value.as_ref());
        self.arg(flag)
    }

    /// Feeds `payload` to the command's standard input.
    #[must_use]
    pub fn stdin(mut self, payload: Vec<u8>) -> Self {
        self.stdin = Some(payload);
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments in order.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Standard input payload, when present.
    #[must_use]
    pub fn stdin_payload(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    /// Returns `true` when an argument equals `expected`.
    #[must_use]
    pub fn has_arg(&self, expected: &str) -> bool {
        self.args.iter().any(|arg| arg == expected)
    }

    /// Returns the value of a `--name=value` option.
    #[must_use]
    pub fn option_value(&self, name: &str) -> Option<PathBuf> {
        let prefix = format!("--{name}=");
        self.args.iter().find_map(|arg| {
            arg.to_str()
                .and_then(|text| text.strip_prefix(prefix.as_str()))
                .map(PathBuf::from)
        })
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitState(Option<i32>);

impl ExitState {
    /// Process exited with `code`.
    #[must_use]
    pub const fn code(code: i32) -> Self {
        Self(Some(code))
    }

    /// Process was terminated by a signal.
    #[must_use]
    pub const fn signalled() -> Self {
        Self(None)
    }

    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.0, Some(0))
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

impl From<std::process::ExitStatus> for ExitState {
    fn from(status: std::process::ExitStatus) -> Self {
        Self(status.code())
    }
}

/// Captured result of a synchronous command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit state.
    pub status: ExitState,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Successful output carrying `stdout`.
    #[must_use]
    pub const fn success(stdout: Vec<u8>) -> Self {
        Self {
            status: ExitState::code(0),
            stdout,
            stderr: Vec::new(),
        }
    }

    /// Failed output with `code` and `stderr`.
    #[must_use]
    pub fn failure(code: i32, stderr: &str) -> Self {
        Self {
            status: ExitState::code(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    /// Converts a failed exit into [`DatabaseError::CommandFailed`].
    pub(crate) fn into_checked(self, step: &'static str) -> Result<Vec<u8>, DatabaseError> {
        if self.status.success() {
            Ok(self.stdout)
        } else {
            Err(DatabaseError::CommandFailed {
                step,
                status: self.status.to_string(),
                stderr: String::from_utf8_lossy(&self.stderr).trim().to_owned(),
            })
        }
    }
}

/// Handle on an asynchronously launched process.
pub trait ServerHandle: Send {
    /// OS process id of the launched process.
    fn id(&self) -> u32;

    /// Returns the exit state when the process has ended.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Supervise`] when the status cannot be queried.
    fn try_wait(&mut self) -> Result<Option<ExitState>, DatabaseError>;

    /// Forcefully terminates the process and reaps it.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Supervise`] when signalling fails.
    fn kill(&mut self) -> Result<(), DatabaseError>;
}

/// Executes and supervises subprocesses.
pub trait ProcessRunner {
    /// Runs `command` to completion, capturing its output.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Spawn`] when the command cannot start.
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, DatabaseError>;

    /// Launches `command` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Spawn`] when the command cannot start.
    fn spawn(&self, command: &CommandSpec) -> Result<Box<dyn ServerHandle>, DatabaseError>;

    /// Sends a kill signal to `pid`. A pid that no longer exists is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Supervise`] when the signal is refused.
    fn kill_pid(&self, pid: u32) -> Result<(), DatabaseError>;
}

/// Production runner backed by `std::process` and `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    /// Builds the runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, DatabaseError> {
        debug!(
            target: DB_TARGET,
            program = %command.program().display(),
            args = ?command.args(),
            "running command"
        );
        let mut child = build_command(command)
            .stdin(if command.stdin_payload().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| spawn_error(command, source))?;

        let writer = match (child.stdin.take(), command.stdin_payload()) {
            (Some(stdin), Some(payload)) => Some(feed_stdin(stdin, payload.to_vec())),
            _ => None,
        };
        let output = child
            .wait_with_output()
            .map_err(|source| spawn_error(command, source))?;
        if let Some(handle) = writer
            && let Ok(Err(error)) = handle.join()
        {
            debug!(
                target: DB_TARGET,
                program = %command.program().display(),
                %error,
                "stdin writer stopped early"
            );
        }
        Ok(ProcessOutput {
            status: output.status.into(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn spawn(&self, command: &CommandSpec) -> Result<Box<dyn ServerHandle>, DatabaseError> {
        let child = build_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| spawn_error(command, source))?;
        debug!(
            target: DB_TARGET,
            program = %command.program().display(),
            pid = child.id(),
            "spawned process"
        );
        Ok(Box::new(ChildHandle { child }))
    }

    fn kill_pid(&self, pid: u32) -> Result<(), DatabaseError> {
        let raw = i32::try_from(pid).map_err(|_| DatabaseError::Supervise {
            pid,
            message: String::from("pid exceeds the platform range"),
        })?;
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(DatabaseError::Supervise {
                pid,
                message: errno.to_string(),
            }),
        }
    }
}

fn build_command(spec: &CommandSpec) -> Command {
    let mut command = Command::new(spec.program());
    command.args(spec.args());
    command
}

fn spawn_error(command: &CommandSpec, source: io::Error) -> DatabaseError {
    DatabaseError::Spawn {
        program: command.program().to_path_buf(),
        source: Arc::new(source),
    }
}

/// Writes the payload on a separate thread so a chatty child cannot block on
/// a full stdout pipe while we are still writing its input.
fn feed_stdin(
    mut stdin: std::process::ChildStdin,
    payload: Vec<u8>,
) -> thread::JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        match stdin.write_all(&payload) {
            Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
        // Dropping stdin closes the pipe and signals end of input.
    })
}

struct ChildHandle {
    child: Child,
}

impl ServerHandle for ChildHandle {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<ExitState>, DatabaseError> {
        self.child
            .try_wait()
            .map(|status| status.map(ExitState::from))
            .map_err(|error| DatabaseError::Supervise {
                pid: self.child.id(),
                message: error.to_string(),
            })
    }

    fn kill(&mut self) -> Result<(), DatabaseError> {
        let pid = self.child.id();
        let supervise = |error: io::Error| DatabaseError::Supervise {
            pid,
            message: error.to_string(),
        };
        match self.child.kill() {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::InvalidInput => {}
            Err(error) => return Err(supervise(error)),
        }
        self.child.wait().map(drop).map_err(supervise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_builds_long_flag() {
        let spec = CommandSpec::new("/usr/bin/mariadbd").option("socket", "/tmp/s");
        assert!(spec.has_arg("--socket=/tmp/s"));
        assert_eq!(spec.option_value("socket"), Some(PathBuf::from("/tmp/s")));
        assert_eq!(spec.option_value("datadir"), None);
    }

    #[test]
    fn failed_output_is_rejected_with_stderr() {
        let error = ProcessOutput::failure(3, "boom\n")
            .into_checked("setup")
            .expect_err("non-zero exit should fail");
        match error {
            DatabaseError::CommandFailed {
                step,
                status,
                stderr,
            } => {
                assert_eq!(step, "setup");
                assert_eq!(status, "exit code 3");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signalled_exit_is_not_success() {
        assert!(!ExitState::signalled().success());
        assert_eq!(ExitState::signalled().to_string(), "terminated by signal");
    }

    #[test]
    fn system_runner_captures_stdin_round_trip() {
        let spec = CommandSpec::new("cat").stdin(b"select 1;".to_vec());
        let output = SystemProcessRunner::new().run(&spec).expect("cat should run");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"select 1;");
    }

    #[test]
    fn system_runner_reports_missing_programs() {
        let spec = CommandSpec::new("/nonexistent/hostbench-tool");
        let error = SystemProcessRunner::new()
            .run(&spec)
            .expect_err("missing program should fail");
        assert!(matches!(error, DatabaseError::Spawn { .. }));
    }

    #[test]
    fn spawned_handle_is_killed_and_reaped() {
        let runner = SystemProcessRunner::new();
        let mut handle = runner
            .spawn(&CommandSpec::new("sleep").arg("30"))
            .expect("sleep should spawn");
        assert!(handle.try_wait().expect("status query").is_none());
        handle.kill().expect("kill should succeed");
        assert!(handle.try_wait().is_ok());
    }
}
