//! Lifecycle of the throwaway database server.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostbench_config::HarnessConfig;
use nix::unistd::{User, geteuid};
use once_cell::unsync::OnceCell;
use tracing::{debug, info, warn};

use crate::DB_TARGET;
use crate::bootstrap::provisioning_script;
use crate::error::DatabaseError;
use crate::files::{SessionLayout, read_pid};
use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::readiness::{self, ReadinessBudget};
use crate::runner::{CommandSpec, ProcessRunner, SystemProcessRunner};
use crate::session::{ConnectionDescriptor, DatabasePurpose, DatabaseSession, ServerDescriptor};
use crate::tools::{PathToolLocator, ToolKind, ToolLocator};

/// Prefix of every session directory created under the system temp dir.
const SESSION_PREFIX: &str = "hostbench-db-";

/// Owns at most one ephemeral database server.
///
/// The server is killed rather than shut down: its data is disposable and a
/// clean start for the next session matters more than a flushed checkpoint.
/// Dropping the manager stops any server it still tracks.
pub struct DatabaseManager<R = SystemProcessRunner, L = PathToolLocator>
where
    R: ProcessRunner,
    L: ToolLocator,
{
    config: HarnessConfig,
    runner: R,
    locator: L,
    reporter: Arc<dyn LifecycleReporter>,
    os_user: String,
    session: Option<DatabaseSession>,
}

impl DatabaseManager {
    /// Builds a manager backed by real processes and executables resolved
    /// from the configured tool directory and `PATH`.
    #[must_use]
    pub fn system(config: HarnessConfig) -> Self {
        let locator = PathToolLocator::new(config.tool_dir());
        Self::new(config, SystemProcessRunner::new(), locator)
    }
}

impl<R, L> DatabaseManager<R, L>
where
    R: ProcessRunner,
    L: ToolLocator,
{
    /// Builds a manager from explicit collaborators.
    #[must_use]
    pub fn new(config: HarnessConfig, runner: R, locator: L) -> Self {
        Self {
            config,
            runner,
            locator,
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            os_user: current_os_user(),
            session: None,
        }
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Process runner used for every subprocess.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns `true` while a server session is tracked.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Descriptor of the running server, if any.
    #[must_use]
    pub fn descriptor(&self) -> Option<&ServerDescriptor> {
        self.session.as_ref().map(|session| &session.descriptor)
    }

    /// Provisions a fresh server, waits for it to accept connections and
    /// runs the account bootstrap.
    ///
    /// Any server started earlier is stopped first. On failure the partial
    /// session is torn down before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when a tool is missing, a setup or
    /// bootstrap command fails, or the server does not become ready within
    /// the configured budget.
    pub fn start_server(&mut self) -> Result<ServerDescriptor, DatabaseError> {
        self.stop_server();
        self.reporter.server_starting();
        match self.launch() {
            Ok(descriptor) => Ok(descriptor),
            Err(error) => {
                self.reporter.server_failed(&error);
                self.stop_server();
                Err(error)
            }
        }
    }

    fn launch(&mut self) -> Result<ServerDescriptor, DatabaseError> {
        let directory = tempfile::Builder::new()
            .prefix(SESSION_PREFIX)
            .tempdir()
            .map_err(|source| DatabaseError::TempDir {
                source: Arc::new(source),
            })?;
        let layout = SessionLayout::under(directory.path());
        let setup = self.locator.locate(ToolKind::Setup)?;
        let server = self.locator.locate(ToolKind::Server)?;
        let client = self.locator.locate(ToolKind::Client)?;
        layout.prepare()?;

        self.runner
            .run(&setup_command(&setup, &layout, &self.os_user))?
            .into_checked("setup")?;
        debug!(
            target: DB_TARGET,
            datadir = %layout.data_directory.display(),
            "data directory initialised"
        );

        let budget = ReadinessBudget::from(&self.config);
        let script = provisioning_script(
            &self.config,
            &self.database_name(DatabasePurpose::Primary),
            &self.database_name(DatabasePurpose::Connector),
        );
        let descriptor = ServerDescriptor {
            directory: layout.root.clone(),
            data_directory: layout.data_directory.clone(),
            socket: layout.socket.clone(),
            pid_file: layout.pid_file.clone(),
            error_log: layout.error_log.clone(),
            os_user: self.os_user.clone(),
            db_user: self.config.db_user.clone(),
            db_password: self.config.db_password.clone(),
        };

        let handle = self
            .runner
            .spawn(&server_command(&server, &layout, &self.os_user))?;
        let session = self.session.insert(DatabaseSession {
            directory,
            descriptor,
            server: handle,
            server_pid: None,
            connection: OnceCell::new(),
        });

        readiness::wait_for_log_file(&layout.error_log, budget)?;
        readiness::wait_for_ready(&layout.error_log, session.server.as_mut(), budget)?;
        let pid = read_pid(&layout.pid_file)?;
        session.server_pid = Some(pid);

        let bootstrap = client_command(&client, &layout.socket, &self.os_user)
            .stdin(script.into_bytes());
        self.runner.run(&bootstrap)?.into_checked("bootstrap")?;

        self.reporter.server_ready(&session.descriptor, pid);
        Ok(session.descriptor.clone())
    }

    /// Deterministic database name for `purpose`.
    #[must_use]
    pub fn database_name(&self, purpose: DatabasePurpose) -> String {
        match purpose {
            DatabasePurpose::Primary => self.config.database_name.clone(),
            DatabasePurpose::Connector => format!(
                "{}{}",
                self.config.database_name, self.config.connector_suffix
            ),
        }
    }

    /// Dumps the database for `purpose`, routines included, into the
    /// artifacts directory as `<basename>-<database>.sql`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NotRunning`] without a server, or the dump
    /// tool's failure with its captured stderr.
    pub fn dump_database(
        &self,
        purpose: DatabasePurpose,
        basename: &str,
    ) -> Result<PathBuf, DatabaseError> {
        let session = self.session.as_ref().ok_or(DatabaseError::NotRunning)?;
        let dump = self.locator.locate(ToolKind::Dump)?;
        let database = self.database_name(purpose);
        let command = CommandSpec::new(dump)
            .arg("--no-defaults")
            .option("socket", session.socket_path())
            .option("user", &self.os_user)
            .arg("--routines")
            .arg(&database);
        let contents = self.runner.run(&command)?.into_checked("dump")?;

        let artifacts = &self.config.artifacts_dir;
        fs::create_dir_all(artifacts)
            .map_err(|source| DatabaseError::write_file(artifacts, source))?;
        let target = artifacts.join(format!("{basename}-{database}.sql"));
        fs::write(&target, contents).map_err(|source| DatabaseError::write_file(&target, source))?;
        info!(
            target: DB_TARGET,
            database = %database,
            path = %target.display(),
            "database dumped"
        );
        Ok(target)
    }

    /// Feeds the SQL script at `path` to the database for `purpose`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NotRunning`] without a server,
    /// [`DatabaseError::ReadFile`] when the script is unreadable, or the
    /// client's failure with its captured stderr.
    pub fn load_sql(&self, purpose: DatabasePurpose, path: &Path) -> Result<(), DatabaseError> {
        let session = self.session.as_ref().ok_or(DatabaseError::NotRunning)?;
        let script = fs::read(path).map_err(|source| DatabaseError::read_file(path, source))?;
        let client = self.locator.locate(ToolKind::Client)?;
        let database = self.database_name(purpose);
        let command = client_command(&client, session.socket_path(), &self.os_user)
            .arg(&database)
            .stdin(script);
        self.runner.run(&command)?.into_checked("load")?;
        debug!(
            target: DB_TARGET,
            database = %database,
            script = %path.display(),
            "sql script loaded"
        );
        Ok(())
    }

    /// Connection descriptor of the primary database, built on first use.
    ///
    /// Returns `None` while no server is running.
    #[must_use]
    pub fn database_config(&self) -> Option<&ConnectionDescriptor> {
        let session = self.session.as_ref()?;
        Some(session.connection.get_or_init(|| {
            ConnectionDescriptor::over_socket(
                &self.config.database_name,
                session.socket_path(),
                &self.config.db_user,
                &self.config.db_password,
            )
        }))
    }

    /// Kills the tracked server and reclaims its directory.
    ///
    /// Calling it without a running server does nothing. Teardown problems
    /// are logged, never returned.
    pub fn stop_server(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let DatabaseSession {
            directory,
            mut server,
            server_pid,
            ..
        } = session;

        let handle_pid = server.id();
        if let Err(error) = server.kill() {
            warn!(
                target: DB_TARGET,
                pid = handle_pid,
                %error,
                "failed to kill server handle"
            );
        }
        if let Some(pid) = server_pid
            && let Err(error) = self.runner.kill_pid(pid)
        {
            warn!(
                target: DB_TARGET,
                pid,
                %error,
                "failed to kill server pid"
            );
        }

        let path = directory.path().to_path_buf();
        if let Err(error) = directory.close() {
            warn!(
                target: DB_TARGET,
                directory = %path.display(),
                %error,
                "failed to remove session directory"
            );
        }
        self.reporter.server_stopped(&path);
    }
}

impl<R, L> Drop for DatabaseManager<R, L>
where
    R: ProcessRunner,
    L: ToolLocator,
{
    fn drop(&mut self) {
        self.stop_server();
    }
}

fn setup_command(program: &Path, layout: &SessionLayout, os_user: &str) -> CommandSpec {
    // The defaults file must come first for the server tool chain.
    CommandSpec::new(program)
        .option("defaults-file", &layout.defaults_file)
        .option("datadir", &layout.data_directory)
        .option("user", os_user)
        .arg("--auth-root-authentication-method=socket")
        .option("auth-root-socket-user", os_user)
        .arg("--skip-test-db")
}

fn server_command(program: &Path, layout: &SessionLayout, os_user: &str) -> CommandSpec {
    CommandSpec::new(program)
        .option("defaults-file", &layout.defaults_file)
        .option("datadir", &layout.data_directory)
        .option("socket", &layout.socket)
        .option("pid-file", &layout.pid_file)
        .option("log-error", &layout.error_log)
        .option("user", os_user)
}

fn client_command(program: &Path, socket: &Path, os_user: &str) -> CommandSpec {
    CommandSpec::new(program)
        .arg("--no-defaults")
        .option("socket", socket)
        .option("user", os_user)
}

/// Account the server trusts for socket authentication.
fn current_os_user() -> String {
    match User::from_uid(geteuid()) {
        Ok(Some(user)) => user.name,
        Ok(None) | Err(_) => std::env::var("USER").unwrap_or_else(|_| String::from("root")),
    }
}
