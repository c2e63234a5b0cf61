//! Executable resolution for the database tool chain.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::DB_TARGET;
use crate::error::DatabaseError;

/// Logical database tools the manager needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Data directory initialiser.
    Setup,
    /// Server daemon.
    Server,
    /// Interactive SQL client, used for bootstrap and fixture loads.
    Client,
    /// Logical backup tool.
    Dump,
}

impl ToolKind {
    /// Executable name searched for this tool.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Setup => "mariadb-install-db",
            Self::Server => "mariadbd",
            Self::Client => "mariadb",
            Self::Dump => "mariadb-dump",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Server => "server",
            Self::Client => "client",
            Self::Dump => "dump",
        };
        f.write_str(label)
    }
}

/// Maps a logical tool to an executable path.
///
/// The manager never guesses locations itself; an absent tool surfaces as
/// [`DatabaseError::ToolNotFound`] straight away.
pub trait ToolLocator {
    /// Returns the executable path for `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ToolNotFound`] when the tool is unavailable.
    fn locate(&self, tool: ToolKind) -> Result<PathBuf, DatabaseError>;
}

/// Locator consulting an optional tool directory, then `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PathToolLocator {
    tool_dir: Option<PathBuf>,
}

impl PathToolLocator {
    /// Builds a locator that prefers executables under `tool_dir`.
    #[must_use]
    pub fn new(tool_dir: Option<&Path>) -> Self {
        Self {
            tool_dir: tool_dir.map(Path::to_path_buf),
        }
    }
}

impl ToolLocator for PathToolLocator {
    fn locate(&self, tool: ToolKind) -> Result<PathBuf, DatabaseError> {
        let program = tool.program();
        if let Some(dir) = &self.tool_dir {
            let candidate = dir.join(program);
            if candidate.is_file() {
                debug!(
                    target: DB_TARGET,
                    %tool,
                    path = %candidate.display(),
                    "resolved tool from tool directory"
                );
                return Ok(candidate);
            }
        }
        which::which(program).map_err(|error| DatabaseError::ToolNotFound {
            tool,
            program,
            message: error.to_string(),
        })
    }
}
