//! Scripted collaborators that drive [`DatabaseManager`](crate::DatabaseManager)
//! without real database binaries.
//!
//! [`ScriptedRunner`] plays the part of the tool chain: synchronous commands
//! succeed unless a failure was scripted for their program, and a spawned
//! "server" writes its error log and pid file according to a
//! [`ServerBehaviour`]. Every command and kill request is recorded.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::DatabaseError;
use crate::readiness::READY_MARKER;
use crate::runner::{CommandSpec, ExitState, ProcessOutput, ProcessRunner, ServerHandle};
use crate::tools::{ToolKind, ToolLocator};

/// Pid the scripted server writes to its pid file.
pub const SCRIPTED_SERVER_PID: u32 = 424_242;

/// Pid of the scripted process handle, distinct from the recorded pid.
pub const SCRIPTED_HANDLE_PID: u32 = 4_242;

/// How the scripted server behaves once spawned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerBehaviour {
    /// Logs the ready marker and writes its pid file.
    #[default]
    Ready,
    /// Logs the given text but never reports readiness.
    Silent(String),
    /// Logs the given text and exits with the given code.
    Crash(String, i32),
    /// Never creates its log file.
    NoLog,
}

#[derive(Debug, Default)]
struct ScriptState {
    behaviour: ServerBehaviour,
    outputs: BTreeMap<String, ProcessOutput>,
    commands: Vec<CommandSpec>,
    spawned: Vec<CommandSpec>,
    killed_pids: Vec<u32>,
    handle_kills: usize,
}

/// Recording process runner with scripted outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    /// Builds a runner whose server becomes ready immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how spawned servers behave.
    pub fn set_behaviour(&self, behaviour: ServerBehaviour) {
        self.lock().behaviour = behaviour;
    }

    /// Scripts the output returned for commands running `program`.
    pub fn respond(&self, program: &str, output: ProcessOutput) {
        self.lock().outputs.insert(program.to_owned(), output);
    }

    /// Synchronous commands executed so far.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.lock().commands.clone()
    }

    /// Synchronous commands whose program is named `program`.
    #[must_use]
    pub fn commands_for(&self, program: &str) -> Vec<CommandSpec> {
        self.lock()
            .commands
            .iter()
            .filter(|command| program_name(command.program()) == program)
            .cloned()
            .collect()
    }

    /// Commands launched asynchronously so far.
    #[must_use]
    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.lock().spawned.clone()
    }

    /// Pids passed to [`ProcessRunner::kill_pid`].
    #[must_use]
    pub fn killed_pids(&self) -> Vec<u32> {
        self.lock().killed_pids.clone()
    }

    /// Number of times a spawned handle was killed.
    #[must_use]
    pub fn handle_kills(&self) -> usize {
        self.lock().handle_kills
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, DatabaseError> {
        let mut state = self.lock();
        state.commands.push(command.clone());
        let output = state
            .outputs
            .get(program_name(command.program()))
            .cloned()
            .unwrap_or_else(|| ProcessOutput::success(Vec::new()));
        Ok(output)
    }

    fn spawn(&self, command: &CommandSpec) -> Result<Box<dyn ServerHandle>, DatabaseError> {
        let behaviour = {
            let mut state = self.lock();
            state.spawned.push(command.clone());
            state.behaviour.clone()
        };
        let log = command.option_value("log-error");
        let pid_file = command.option_value("pid-file");
        let exit = match &behaviour {
            ServerBehaviour::Ready => {
                write_optional(log.as_deref(), &format!("mariadbd: {READY_MARKER}.\n"))?;
                write_optional(pid_file.as_deref(), &format!("{SCRIPTED_SERVER_PID}\n"))?;
                None
            }
            ServerBehaviour::Silent(text) => {
                write_optional(log.as_deref(), text)?;
                None
            }
            ServerBehaviour::Crash(text, code) => {
                write_optional(log.as_deref(), text)?;
                Some(ExitState::code(*code))
            }
            ServerBehaviour::NoLog => None,
        };
        Ok(Box::new(ScriptedServer {
            exit,
            state: Arc::clone(&self.state),
        }))
    }

    fn kill_pid(&self, pid: u32) -> Result<(), DatabaseError> {
        self.lock().killed_pids.push(pid);
        Ok(())
    }
}

struct ScriptedServer {
    exit: Option<ExitState>,
    state: Arc<Mutex<ScriptState>>,
}

impl ServerHandle for ScriptedServer {
    fn id(&self) -> u32 {
        SCRIPTED_HANDLE_PID
    }

    fn try_wait(&mut self) -> Result<Option<ExitState>, DatabaseError> {
        Ok(self.exit)
    }

    fn kill(&mut self) -> Result<(), DatabaseError> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle_kills += 1;
        self.exit.get_or_insert(ExitState::signalled());
        Ok(())
    }
}

/// Locator answering every tool with `<root>/<program>`.
#[derive(Debug, Clone)]
pub struct FixedToolLocator {
    root: PathBuf,
}

impl FixedToolLocator {
    /// Resolves tools under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FixedToolLocator {
    fn default() -> Self {
        Self::new("/opt/hostbench/bin")
    }
}

impl ToolLocator for FixedToolLocator {
    fn locate(&self, tool: ToolKind) -> Result<PathBuf, DatabaseError> {
        Ok(self.root.join(tool.program()))
    }
}

fn program_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}

fn write_optional(path: Option<&Path>, contents: &str) -> Result<(), DatabaseError> {
    match path {
        Some(path) => {
            fs::write(path, contents).map_err(|source| DatabaseError::write_file(path, source))
        }
        None => Ok(()),
    }
}
