//! Session directory layout and the small files the server reads or writes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DatabaseError;

/// Name of the server defaults file inside the session directory.
pub const DEFAULTS_FILE: &str = "mariadbd.cnf";

/// Only the local socket is exposed; TCP listeners stay closed.
const DEFAULTS_CONTENTS: &str = "[server]\nskip-networking\n";

/// Paths used by one server session, all rooted at the session directory.
#[derive(Debug, Clone)]
pub(crate) struct SessionLayout {
    pub(crate) root: PathBuf,
    pub(crate) data_directory: PathBuf,
    pub(crate) socket: PathBuf,
    pub(crate) pid_file: PathBuf,
    pub(crate) error_log: PathBuf,
    pub(crate) defaults_file: PathBuf,
}

impl SessionLayout {
    pub(crate) fn under(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            data_directory: root.join("db-data"),
            socket: root.join("server-socket"),
            pid_file: root.join("server.pid"),
            error_log: root.join("server.err"),
            defaults_file: root.join(DEFAULTS_FILE),
        }
    }

    /// Writes the defaults file and creates the data directory.
    pub(crate) fn prepare(&self) -> Result<(), DatabaseError> {
        fs::create_dir_all(&self.data_directory)
            .map_err(|source| DatabaseError::write_file(&self.data_directory, source))?;
        fs::write(&self.defaults_file, DEFAULTS_CONTENTS)
            .map_err(|source| DatabaseError::write_file(&self.defaults_file, source))
    }
}

/// Reads the pid the server recorded once it became ready.
pub(crate) fn read_pid(path: &Path) -> Result<u32, DatabaseError> {
    let content = fs::read_to_string(path).map_err(|error| DatabaseError::PidFile {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    let trimmed = content.trim();
    trimmed.parse::<u32>().map_err(|error| DatabaseError::PidFile {
        path: path.to_path_buf(),
        message: format!("'{trimmed}' is not a pid: {error}"),
    })
}

/// Returns the last `lines` lines of `text`.
pub(crate) fn tail(text: &str, lines: usize) -> String {
    let collected: Vec<&str> = text.lines().collect();
    let start = collected.len().saturating_sub(lines);
    collected.get(start..).unwrap_or_default().join("\n")
}

/// Reads the log for diagnostics, tolerating a log that vanished.
pub(crate) fn read_log_lossy(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
        Err(error) => format!("<unable to read {}: {error}>", path.display()),
    }
}
