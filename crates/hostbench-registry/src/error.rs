//! Error surface of the registry engine.

use thiserror::Error;

use crate::id::ServiceId;

/// Errors raised while resolving or overriding services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No double, original instance or factory could produce the service.
    #[error("service '{id}' not found in registry '{registry}'")]
    ServiceNotFound {
        /// Requested identifier.
        id: ServiceId,
        /// Registry that gave up.
        registry: String,
    },

    /// A resolved instance did not have the requested type.
    #[error("service '{id}' is not a {expected}")]
    TypeMismatch {
        /// Requested identifier.
        id: ServiceId,
        /// Type the caller asked for.
        expected: &'static str,
    },

    /// An override targeted a module without a registry.
    #[error("module '{module}' has no registry")]
    ModuleNotFound {
        /// Module name.
        module: String,
    },

    /// A factory reported a construction failure.
    #[error("factory for '{id}' failed: {message}")]
    Factory {
        /// Identifier the factory was registered under.
        id: ServiceId,
        /// Description of the failure.
        message: String,
    },

    /// An override wrapper outlived the harness context that installed it.
    #[error("override for '{id}' was installed by a harness that no longer exists")]
    HarnessDropped {
        /// Identifier the wrapper was installed for.
        id: ServiceId,
    },
}
