//! Harness diagnostics for test binaries.
//!
//! Each test binary gets exactly one global subscriber. Suites open
//! [`crate::HarnessSession`]s from many tests, often in parallel, so
//! [`initialise`] installs on the first call and every later call returns
//! the handle of that first installation, whatever configuration it is
//! given. Events from `hostbench_db`, `hostbench_registry`, `hostbench_mock`
//! and this crate go to stderr, filtered by `HOSTBENCH_LOG_FILTER`.

use std::io::{self, IsTerminal};

use hostbench_config::{HarnessConfig, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::TELEMETRY_TARGET;

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the test binary's subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid directive list.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Something other than the harness installed a global subscriber first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the test binary's subscriber on first use.
///
/// ```rust
/// use hostbench::telemetry;
/// use hostbench_config::{HarnessConfig, LogFormat};
///
/// # fn main() -> Result<(), hostbench::telemetry::TelemetryError> {
/// let first = telemetry::initialise(&HarnessConfig::default())?;
/// let json = HarnessConfig {
///     log_format: LogFormat::Json,
///     ..HarnessConfig::default()
/// };
/// assert_eq!(telemetry::initialise(&json)?, first);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the configured filter does not
/// parse and [`TelemetryError::Subscriber`] when another subscriber was
/// installed first. A failed call leaves nothing installed, so a later call
/// with a corrected configuration may still succeed.
pub fn initialise(config: &HarnessConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config).map(|()| config.log_format))
        .map(|format| TelemetryHandle { format: *format })
}

pub(crate) fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &HarnessConfig) -> Result<(), TelemetryError> {
    let filter = parse_filter(&config.log_filter)?;
    let ansi = !config.log_format.is_structured() && io::stderr().is_terminal();

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(io::stderr)
            .with_ansi(ansi)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    debug!(
        target: TELEMETRY_TARGET,
        format = %config.log_format,
        filter = %config.log_filter,
        "harness telemetry installed"
    );
    Ok(())
}
