//! Ephemeral database server lifecycle for integration tests.
//!
//! [`DatabaseManager`] provisions a throwaway MariaDB-compatible server per
//! test session: it initialises a data directory inside a fresh temporary
//! directory, launches the daemon with networking disabled, watches the error
//! log until the server reports readiness and then provisions the test
//! accounts and databases over the local socket. Tests receive a
//! [`ConnectionDescriptor`] addressing the primary database through that
//! socket.
//!
//! All subprocess work goes through the [`ProcessRunner`] boundary and every
//! executable is resolved through a [`ToolLocator`], so the whole protocol
//! runs against scripted fakes in unit tests. Startup is never retried: a
//! missing tool, a failing setup step or an exhausted readiness budget is a
//! fatal [`DatabaseError`] carrying the server log tail where one exists.
//!
//! Teardown is forceful. [`DatabaseManager::stop_server`] kills the server
//! through its process handle and through the pid the server recorded, then
//! removes the session directory.

mod bootstrap;
mod error;
mod files;
mod health;
mod manager;
mod readiness;
mod runner;
mod session;
mod tools;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Target used for manager diagnostics.
pub(crate) const DB_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::manager");

pub use error::DatabaseError;
pub use files::DEFAULTS_FILE;
pub use health::{HEALTH_TARGET, LifecycleReporter, StructuredLifecycleReporter};
pub use manager::DatabaseManager;
pub use readiness::READY_MARKER;
pub use runner::{
    CommandSpec, ExitState, ProcessOutput, ProcessRunner, ServerHandle, SystemProcessRunner,
};
pub use session::{
    CONNECTION_HOST, CONNECTION_SCHEME, ConnectionDescriptor, DatabasePurpose, ServerDescriptor,
};
pub use tools::{PathToolLocator, ToolKind, ToolLocator};

#[cfg(test)]
mod tests;
