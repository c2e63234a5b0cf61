//! Default values shared by the configuration loader and programmatic users.

use std::path::PathBuf;

use crate::logging::LogFormat;

/// Name of the primary application database.
pub const DEFAULT_DATABASE_NAME: &str = "hostbench_test";

/// Suffix appended to the primary database name for the connector database.
pub const DEFAULT_CONNECTOR_SUFFIX: &str = "_connector";

/// Restricted account used by application code under test.
pub const DEFAULT_DB_USER: &str = "apptest";

/// Password of the restricted test account.
pub const DEFAULT_DB_PASSWORD: &str = "apptest";

/// Secondary account provisioned for the cloud connector.
pub const DEFAULT_CLOUD_USER: &str = "cloud";

/// Password of the cloud connector account.
pub const DEFAULT_CLOUD_PASSWORD: &str = "cloud";

/// Directory receiving database dumps.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Number of spins spent waiting for the server log file to appear.
pub const DEFAULT_LOG_WAIT_ITERATIONS: u64 = 10_000;

/// Sleep between two log file existence checks, in microseconds.
pub const DEFAULT_LOG_WAIT_INTERVAL_US: u64 = 10;

/// Upper bound for one readiness wait, in milliseconds.
pub const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 1_000;

/// Number of readiness waits before startup is abandoned.
pub const DEFAULT_READY_ITERATIONS: u32 = 10;

/// Number of server log lines attached to fatal startup errors.
pub const DEFAULT_LOG_TAIL_LINES: usize = 40;

/// Module whose services are fully replaced by doubles.
pub const DEFAULT_MODULE_UNDER_TEST: &str = "app";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "warn,hostbench=info";

pub(crate) fn database_name() -> String {
    DEFAULT_DATABASE_NAME.to_owned()
}

pub(crate) fn connector_suffix() -> String {
    DEFAULT_CONNECTOR_SUFFIX.to_owned()
}

pub(crate) fn db_user() -> String {
    DEFAULT_DB_USER.to_owned()
}

pub(crate) fn db_password() -> String {
    DEFAULT_DB_PASSWORD.to_owned()
}

pub(crate) fn cloud_user() -> String {
    DEFAULT_CLOUD_USER.to_owned()
}

pub(crate) fn cloud_password() -> String {
    DEFAULT_CLOUD_PASSWORD.to_owned()
}

pub(crate) fn artifacts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

pub(crate) const fn log_wait_iterations() -> u64 {
    DEFAULT_LOG_WAIT_ITERATIONS
}

pub(crate) const fn log_wait_interval_us() -> u64 {
    DEFAULT_LOG_WAIT_INTERVAL_US
}

pub(crate) const fn ready_poll_interval_ms() -> u64 {
    DEFAULT_READY_POLL_INTERVAL_MS
}

pub(crate) const fn ready_iterations() -> u32 {
    DEFAULT_READY_ITERATIONS
}

pub(crate) const fn log_tail_lines() -> usize {
    DEFAULT_LOG_TAIL_LINES
}

pub(crate) fn module_under_test() -> String {
    DEFAULT_MODULE_UNDER_TEST.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
