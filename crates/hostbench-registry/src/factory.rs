//! Deferred service construction.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;

/// A resolved service, type-erased.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

type FactoryFn = dyn Fn() -> Result<ServiceInstance, RegistryError> + Send + Sync;

/// Zero-argument constructor stored by registries.
///
/// Clones share the underlying closure, and two factories are the same
/// factory exactly when they share it. Identity sets rely on that.
#[derive(Clone)]
pub struct ServiceFactory(Arc<FactoryFn>);

impl ServiceFactory {
    /// Wraps a fallible constructor.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> Result<ServiceInstance, RegistryError> + Send + Sync + 'static,
    {
        Self(Arc::new(build))
    }

    /// Wraps an infallible constructor of a concrete type.
    pub fn from_fn<T, F>(build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move || Ok(Arc::new(build()) as ServiceInstance))
    }

    /// Factory that always yields `instance`.
    #[must_use]
    pub fn constant(instance: ServiceInstance) -> Self {
        Self::new(move || Ok(Arc::clone(&instance)))
    }

    /// Builds an instance.
    ///
    /// # Errors
    ///
    /// Propagates whatever the constructor reports.
    pub fn invoke(&self) -> Result<ServiceInstance, RegistryError> {
        (self.0)()
    }

    /// Returns `true` when both handles share one constructor.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>().addr()
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceFactory({:#x})", self.identity())
    }
}

/// Whether a registry caches what a factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// Built once, then served from the registry's instance slot.
    #[default]
    Shared,
    /// Rebuilt on every resolve; the factory joins the registry's identity
    /// set.
    Transient,
}

/// Returns `true` when both instances are the same object.
#[must_use]
pub fn same_instance(left: &ServiceInstance, right: &ServiceInstance) -> bool {
    Arc::ptr_eq(left, right)
}
