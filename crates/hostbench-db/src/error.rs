//! Error surface of the ephemeral database manager.
//!
//! Startup failures are fatal for the test session: nothing is retried, and
//! the variants that describe a misbehaving server carry the tail of its
//! error log so the failing run explains itself. I/O errors are wrapped in
//! `Arc` to keep the enum small and cloneable by reference.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::tools::ToolKind;

/// Errors raised while provisioning, using or tearing down the server.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A required executable could not be located.
    #[error("{tool} executable '{program}' not found: {message}")]
    ToolNotFound {
        /// Logical tool that was requested.
        tool: ToolKind,
        /// Executable name that was searched for.
        program: &'static str,
        /// Locator diagnostic.
        message: String,
    },

    /// The per-session temporary directory could not be allocated.
    #[error("failed to allocate temporary directory: {source}")]
    TempDir {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A file inside the session directory could not be written.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A file could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A subprocess could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A synchronous subprocess exited unsuccessfully.
    #[error("{step} failed ({status}): {stderr}")]
    CommandFailed {
        /// Which harness step ran the command.
        step: &'static str,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The server never created its error log.
    #[error("server log '{path}' did not appear within {waited_ms} ms")]
    LogFileMissing {
        /// Expected log file location.
        path: PathBuf,
        /// Time spent waiting.
        waited_ms: u64,
    },

    /// The ready marker was not logged within the readiness budget.
    #[error(
        "server did not report readiness within {waited_ms} ms ({attempts} waits); log tail:\n{log_tail}"
    )]
    ReadinessTimeout {
        /// Number of readiness waits the budget allows.
        attempts: u32,
        /// Time spent waiting for the marker.
        waited_ms: u64,
        /// Captured tail of the server log.
        log_tail: String,
    },

    /// The server process exited before it reported readiness.
    #[error("server exited during startup ({status}); log tail:\n{log_tail}")]
    ServerExited {
        /// Exit status description.
        status: String,
        /// Captured tail of the server log.
        log_tail: String,
    },

    /// The server pid file was missing or malformed after readiness.
    #[error("invalid server pid file '{path}': {message}")]
    PidFile {
        /// Location of the pid file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// An operation needed a running server but none is tracked.
    #[error("no database server is running")]
    NotRunning,

    /// Waiting on or signalling a process failed.
    #[error("failed to supervise process {pid}: {message}")]
    Supervise {
        /// Process identifier.
        pid: u32,
        /// Description of the failure.
        message: String,
    },
}

impl DatabaseError {
    pub(crate) fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Returns the captured server log tail for fatal startup errors.
    #[must_use]
    pub fn log_tail(&self) -> Option<&str> {
        match self {
            Self::ReadinessTimeout { log_tail, .. } | Self::ServerExited { log_tail, .. } => {
                Some(log_tail.as_str())
            }
            _ => None,
        }
    }
}
