//! Structured reporting of database server lifecycle events.

use std::path::Path;
use std::sync::Arc;

use crate::error::DatabaseError;
use crate::session::ServerDescriptor;

/// Target used for lifecycle events.
pub const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer notified as the manager drives the server through its lifecycle.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before the session directory is allocated.
    fn server_starting(&self);

    /// Invoked once the server is ready and provisioned.
    fn server_ready(&self, descriptor: &ServerDescriptor, pid: u32);

    /// Invoked when startup fails. The session is torn down afterwards.
    fn server_failed(&self, error: &DatabaseError);

    /// Invoked after a tracked server has been killed and its directory
    /// released.
    fn server_stopped(&self, directory: &Path);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn server_starting(&self) {
        (**self).server_starting();
    }

    fn server_ready(&self, descriptor: &ServerDescriptor, pid: u32) {
        (**self).server_ready(descriptor, pid);
    }

    fn server_failed(&self, error: &DatabaseError) {
        (**self).server_failed(error);
    }

    fn server_stopped(&self, directory: &Path) {
        (**self).server_stopped(directory);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn server_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_starting",
            "starting ephemeral database server"
        );
    }

    fn server_ready(&self, descriptor: &ServerDescriptor, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_ready",
            pid,
            socket = %descriptor.socket.display(),
            directory = %descriptor.directory.display(),
            os_user = %descriptor.os_user,
            "ephemeral database server ready"
        );
    }

    fn server_failed(&self, error: &DatabaseError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "server_failed",
            error = %error,
            log_tail = error.log_tail().unwrap_or_default(),
            "ephemeral database server failed to start"
        );
    }

    fn server_stopped(&self, directory: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            directory = %directory.display(),
            "ephemeral database server stopped"
        );
    }
}
