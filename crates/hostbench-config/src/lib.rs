//! Layered configuration for the hostbench test harness.
//!
//! [`HarnessConfig`] is resolved with `ortho_config`: built-in defaults, an
//! optional `hostbench.toml`, then `HOSTBENCH_*` environment variables. Every
//! field carries a serde default so an empty environment yields a usable
//! configuration, and [`HarnessConfig::default`] serves programmatic callers.
//!
//! The database budgets (`log_wait_*`, `ready_*`) bound how long the ephemeral
//! server may take to come up. They are upper bounds; a healthy server is
//! detected as soon as its ready marker is logged.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ARTIFACTS_DIR, DEFAULT_CLOUD_PASSWORD, DEFAULT_CLOUD_USER, DEFAULT_CONNECTOR_SUFFIX,
    DEFAULT_DATABASE_NAME, DEFAULT_DB_PASSWORD, DEFAULT_DB_USER, DEFAULT_LOG_FILTER,
    DEFAULT_LOG_TAIL_LINES, DEFAULT_LOG_WAIT_INTERVAL_US, DEFAULT_LOG_WAIT_ITERATIONS,
    DEFAULT_MODULE_UNDER_TEST, DEFAULT_READY_ITERATIONS, DEFAULT_READY_POLL_INTERVAL_MS,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Program name handed to the loader in place of `argv[0]`.
///
/// The harness runs inside test binaries whose real arguments belong to the
/// test runner, so they are never forwarded to the configuration parser.
const LOADER_PROGRAM: &str = "hostbench";

/// Settings shared by the database manager, the registry engine and telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTBENCH")]
pub struct HarnessConfig {
    /// Name of the primary application database.
    #[serde(default = "defaults::database_name")]
    pub database_name: String,
    /// Suffix appended to [`Self::database_name`] for the connector database.
    #[serde(default = "defaults::connector_suffix")]
    pub connector_suffix: String,
    /// Restricted account granted access to the application databases.
    #[serde(default = "defaults::db_user")]
    pub db_user: String,
    /// Password of [`Self::db_user`].
    #[serde(default = "defaults::db_password")]
    pub db_password: String,
    /// Account provisioned for the cloud connector.
    #[serde(default = "defaults::cloud_user")]
    pub cloud_user: String,
    /// Password of [`Self::cloud_user`].
    #[serde(default = "defaults::cloud_password")]
    pub cloud_password: String,
    /// Directory receiving database dumps.
    #[serde(default = "defaults::artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Directory searched for database executables before `PATH`.
    ///
    /// An empty path disables the extra lookup.
    #[serde(default)]
    pub tool_dir: PathBuf,
    /// Number of checks for the server log file before giving up.
    #[serde(default = "defaults::log_wait_iterations")]
    pub log_wait_iterations: u64,
    /// Sleep between two log file checks, in microseconds.
    #[serde(default = "defaults::log_wait_interval_us")]
    pub log_wait_interval_us: u64,
    /// Upper bound of a single readiness wait, in milliseconds.
    #[serde(default = "defaults::ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,
    /// Number of readiness waits before startup is abandoned.
    #[serde(default = "defaults::ready_iterations")]
    pub ready_iterations: u32,
    /// Number of trailing server log lines attached to startup errors.
    #[serde(default = "defaults::log_tail_lines")]
    pub log_tail_lines: usize,
    /// Module whose services are entirely replaced by test doubles.
    #[serde(default = "defaults::module_under_test")]
    pub module_under_test: String,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for harness telemetry.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database_name: defaults::database_name(),
            connector_suffix: defaults::connector_suffix(),
            db_user: defaults::db_user(),
            db_password: defaults::db_password(),
            cloud_user: defaults::cloud_user(),
            cloud_password: defaults::cloud_password(),
            artifacts_dir: defaults::artifacts_dir(),
            tool_dir: PathBuf::new(),
            log_wait_iterations: defaults::log_wait_iterations(),
            log_wait_interval_us: defaults::log_wait_interval_us(),
            ready_poll_interval_ms: defaults::ready_poll_interval_ms(),
            ready_iterations: defaults::ready_iterations(),
            log_tail_lines: defaults::log_tail_lines(),
            module_under_test: defaults::module_under_test(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl HarnessConfig {
    /// Loads the configuration from `hostbench.toml` and `HOSTBENCH_*`
    /// variables, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer is malformed and
    /// [`ConfigError::Invalid`] when a loaded value breaks an invariant.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let config = Self::load_from_iter([OsString::from(LOADER_PROGRAM)])
            .map_err(|source| ConfigError::Load { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the harness relies on.
    ///
    /// Database and account names are interpolated into provisioning SQL, so
    /// they are restricted to ASCII alphanumerics and underscores.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("database_name", &self.database_name)?;
        check_connector_suffix(&self.connector_suffix)?;
        check_identifier("db_user", &self.db_user)?;
        check_identifier("cloud_user", &self.cloud_user)?;
        check_secret("db_password", &self.db_password)?;
        check_secret("cloud_password", &self.cloud_password)?;
        if self.ready_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "ready_iterations",
                reason: String::from("must be at least 1"),
            });
        }
        if self.module_under_test.is_empty() {
            return Err(ConfigError::Invalid {
                field: "module_under_test",
                reason: String::from("must not be empty"),
            });
        }
        Ok(())
    }

    /// Upper bound for the log file to appear after the server is launched.
    #[must_use]
    pub fn log_wait_budget(&self) -> Duration {
        Duration::from_micros(
            self.log_wait_iterations
                .saturating_mul(self.log_wait_interval_us),
        )
    }

    /// Sleep between two log file existence checks.
    #[must_use]
    pub const fn log_wait_interval(&self) -> Duration {
        Duration::from_micros(self.log_wait_interval_us)
    }

    /// Upper bound of a single readiness wait.
    #[must_use]
    pub const fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    /// Extra directory searched for executables, when configured.
    #[must_use]
    pub fn tool_dir(&self) -> Option<&Path> {
        if self.tool_dir.as_os_str().is_empty() {
            None
        } else {
            Some(self.tool_dir.as_path())
        }
    }
}

/// Errors raised while loading or validating [`HarnessConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration layer could not be parsed or merged.
    #[error("failed to load harness configuration: {source}")]
    Load {
        /// Aggregated loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// A value violates a harness invariant.
    #[error("invalid configuration value for '{field}': {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: String::from("must not be empty"),
        });
    }
    check_suffix(field, value)
}

fn check_suffix(field: &'static str, value: &str) -> Result<(), ConfigError> {
    match value
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_'))
    {
        Some(ch) => Err(ConfigError::Invalid {
            field,
            reason: format!("character '{ch}' is not allowed in SQL identifiers"),
        }),
        None => Ok(()),
    }
}

/// The connector database must stay distinct from the primary one and match
/// the `<database>\\_%` wildcard grant.
fn check_connector_suffix(value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('_') || value.len() < 2 {
        return Err(ConfigError::Invalid {
            field: "connector_suffix",
            reason: String::from("must start with '_' followed by at least one character"),
        });
    }
    check_suffix("connector_suffix", value)
}

fn check_secret(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.contains(['\'', '\\']) {
        return Err(ConfigError::Invalid {
            field,
            reason: String::from("quotes and backslashes are not allowed"),
        });
    }
    Ok(())
}
