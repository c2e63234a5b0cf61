//! Per-session state of a running server and the descriptors derived from it.

use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use tempfile::TempDir;

use crate::runner::ServerHandle;

/// Scheme understood by the consuming data-access layer.
pub const CONNECTION_SCHEME: &str = "mysql";

/// Host placeholder; the connection always goes through the unix socket.
pub const CONNECTION_HOST: &str = "localhost";

/// Characters escaped in the URL's user information.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Which of the provisioned databases an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabasePurpose {
    /// The primary application database.
    Primary,
    /// The secondary connector database.
    Connector,
}

/// Filesystem layout and identities of a provisioned server.
///
/// Returned by `start_server` for callers that need to poke at the server
/// directly (attach a client, inspect the log).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDescriptor {
    /// Session root directory.
    pub directory: PathBuf,
    /// Server data directory.
    pub data_directory: PathBuf,
    /// Local socket the server listens on.
    pub socket: PathBuf,
    /// File the server writes its pid to.
    pub pid_file: PathBuf,
    /// Server error log.
    pub error_log: PathBuf,
    /// Operating system account the server authenticates administratively.
    pub os_user: String,
    /// Restricted test account.
    pub db_user: String,
    /// Password of the restricted test account.
    pub db_password: String,
}

/// Minimal data needed to address the ephemeral database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    database_name: String,
    url: String,
    username: String,
    password: String,
    socket_path: PathBuf,
}

impl ConnectionDescriptor {
    /// Builds a descriptor addressing `database_name` over `socket_path`.
    ///
    /// The socket is carried as a form-encoded `unix_socket` query parameter
    /// on a synthetic URL; host and scheme are fixed sentinels. Account name
    /// and password are percent-encoded in the user information.
    #[must_use]
    pub fn over_socket(
        database_name: &str,
        socket_path: &Path,
        username: &str,
        password: &str,
    ) -> Self {
        let escaped: String =
            url::form_urlencoded::byte_serialize(socket_path.as_os_str().as_encoded_bytes())
                .collect();
        let user = utf8_percent_encode(username, USERINFO);
        let secret = utf8_percent_encode(password, USERINFO);
        let url = format!(
            "{CONNECTION_SCHEME}://{user}:{secret}@{CONNECTION_HOST}?unix_socket={escaped}"
        );
        Self {
            database_name: database_name.to_owned(),
            url,
            username: username.to_owned(),
            password: password.to_owned(),
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Database the descriptor points at.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Socket the URL encodes.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Live server state; at most one per manager.
pub(crate) struct DatabaseSession {
    pub(crate) directory: TempDir,
    pub(crate) descriptor: ServerDescriptor,
    pub(crate) server: Box<dyn ServerHandle>,
    pub(crate) server_pid: Option<u32>,
    pub(crate) connection: OnceCell<ConnectionDescriptor>,
}

impl DatabaseSession {
    pub(crate) fn socket_path(&self) -> &Path {
        &self.descriptor.socket
    }
}
