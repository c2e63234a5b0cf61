//! Integration test harness for applications hosted in a shared service
//! runtime.
//!
//! The harness has two halves, each in its own crate and re-exported here:
//!
//! - [`hostbench_db`] provisions a throwaway database server per test
//!   session and tears it down forcefully afterwards.
//! - [`hostbench_registry`] and [`hostbench_mock`] snapshot the host's
//!   service registries, install test doubles over them for one test case
//!   and roll everything back before the next.
//!
//! [`HarnessSession`] ties the two together for a suite, and
//! [`telemetry::initialise`] installs structured logging once per test
//! binary.

mod session;
pub mod telemetry;

/// Target used for session diagnostics.
pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Target used for telemetry installation events.
pub(crate) const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

pub use hostbench_config::{ConfigError, HarnessConfig, LogFormat};
pub use hostbench_db::{
    ConnectionDescriptor, DatabaseError, DatabaseManager, DatabasePurpose, LifecycleReporter,
    ServerDescriptor,
};
pub use hostbench_mock::{
    ConfigFallback, ConfigScope, FakeConfigStore, FakeCredentialsStore, FakeLocalisation,
    FakeRequest, FakeSession, FakeUser, FakeUserSession, MockProvider, MockProviderBuilder,
    RequestParams, catalogue,
};
pub use hostbench_registry::{
    HarnessContext, InMemoryRegistry, Registries, RegistryError, ServiceFactory, ServiceId,
    ServiceRegistry, SlotAccess,
};
pub use session::{HarnessSession, SessionError};
pub use telemetry::{TelemetryError, TelemetryHandle};

pub use hostbench_config as config;
pub use hostbench_db as db;
pub use hostbench_mock as mock;
pub use hostbench_registry as registry;

#[cfg(test)]
mod tests;
