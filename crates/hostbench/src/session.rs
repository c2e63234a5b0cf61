//! A harness session pairing the ephemeral database with the registry
//! override engine.

use std::sync::Arc;

use hostbench_config::{ConfigError, HarnessConfig};
use hostbench_db::{
    ConnectionDescriptor, DatabaseError, DatabaseManager, PathToolLocator, ProcessRunner,
    ServerDescriptor, SystemProcessRunner, ToolLocator,
};
use hostbench_mock::{MockProvider, MockProviderBuilder};
use hostbench_registry::{HarnessContext, Registries, RegistryError};
use thiserror::Error;
use tracing::info;

use crate::SESSION_TARGET;
use crate::telemetry::{self, TelemetryError};

/// Errors raised while opening or using a [`HarnessSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The database server could not be provisioned.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// Overrides could not be installed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One test suite's view of the harness.
///
/// Opening a session starts the database server; every test case then asks
/// the session for a [`MockProvider`], which rolls the host registries back
/// to the suite baseline before installing its doubles. [`Self::finish`]
/// resets the registry state and stops the server; dropping the session
/// stops the server too.
pub struct HarnessSession<R = SystemProcessRunner, L = PathToolLocator>
where
    R: ProcessRunner,
    L: ToolLocator,
{
    database: DatabaseManager<R, L>,
    context: Arc<HarnessContext>,
    registries: Registries,
    descriptor: ServerDescriptor,
}

impl HarnessSession {
    /// Loads the configuration from the environment, installs telemetry and
    /// opens a session backed by real database binaries.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when any of those steps fails.
    pub fn from_environment(registries: Registries) -> Result<Self, SessionError> {
        let config = HarnessConfig::from_environment()?;
        telemetry::initialise(&config)?;
        Self::open(DatabaseManager::system(config), registries)
    }
}

impl<R, L> HarnessSession<R, L>
where
    R: ProcessRunner,
    L: ToolLocator,
{
    /// Starts `database` and prepares the override engine for `registries`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Database`] when the server does not start.
    pub fn open(
        mut database: DatabaseManager<R, L>,
        registries: Registries,
    ) -> Result<Self, SessionError> {
        let descriptor = database.start_server()?;
        let context = Arc::new(HarnessContext::from_config(database.config()));
        info!(
            target: SESSION_TARGET,
            socket = %descriptor.socket.display(),
            module_under_test = %database.config().module_under_test,
            "harness session opened"
        );
        Ok(Self {
            database,
            context,
            registries,
            descriptor,
        })
    }

    /// Configuration of the session.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        self.database.config()
    }

    /// Database manager owning the server.
    #[must_use]
    pub const fn database(&self) -> &DatabaseManager<R, L> {
        &self.database
    }

    /// Mutable access to the database manager, for dumps and restarts.
    pub fn database_mut(&mut self) -> &mut DatabaseManager<R, L> {
        &mut self.database
    }

    /// Descriptor returned when the server started.
    #[must_use]
    pub const fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    /// Connection descriptor of the primary database while the server runs.
    #[must_use]
    pub fn connection(&self) -> Option<&ConnectionDescriptor> {
        self.database.database_config()
    }

    /// Registry session state.
    #[must_use]
    pub fn context(&self) -> &Arc<HarnessContext> {
        &self.context
    }

    /// Host registries under test.
    #[must_use]
    pub const fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Builder for the next test case's provider, with the credentials
    /// store seeded from the configured cloud password.
    #[must_use]
    pub fn provider_builder(&self) -> MockProviderBuilder {
        MockProvider::builder(Arc::clone(&self.context), self.registries.clone())
            .with_password(self.config().cloud_password.clone())
    }

    /// Provider for the next test case.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Registry`] when overrides cannot be installed.
    pub fn mock_provider(&self) -> Result<MockProvider, SessionError> {
        Ok(self.provider_builder().build()?)
    }

    /// Restores the registry baseline, forgets the suite state and stops the
    /// server.
    pub fn finish(mut self) {
        self.context.reset_suite(&self.registries);
        self.database.stop_server();
        info!(target: SESSION_TARGET, "harness session finished");
    }
}
