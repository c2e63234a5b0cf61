//! Registry snapshot and service override engine.
//!
//! Integration tests run inside a host whose service registries are shared
//! across the whole process. This crate lets a test swap selected services
//! for doubles and still hand the next test a clean registry:
//!
//! - [`SlotAccess`] is the administrative contract a host registry exposes
//!   so its slot table can be exported and re-imported.
//! - [`RegistrySnapshot`] copies a slot table, deep-copying identity sets one
//!   level and skipping environment singletons, and restores it later.
//! - [`OverrideRegistry`] installs wrapper factories that prefer a double,
//!   then the first real instance observed, then the real factory.
//! - [`HarnessContext`] owns the suite baseline and the override registry and
//!   sequences them per test case.
//!
//! [`InMemoryRegistry`] is a reference host registry implementing the
//! contract. The engine assumes tests run one at a time; the locks inside
//! only keep the types shareable.

mod context;
mod error;
mod factory;
mod id;
mod identity;
mod originals;
mod overrides;
mod registry;
mod slots;
mod snapshot;

/// Target used for registry diagnostics.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Target used for override installation diagnostics.
pub(crate) const OVERRIDES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::overrides");

pub use context::{BaselineAction, ContextState, HarnessContext};
pub use error::RegistryError;
pub use factory::{Lifetime, ServiceFactory, ServiceInstance, same_instance};
pub use id::ServiceId;
pub use identity::{IdentitySet, SharedIdentitySet};
pub use originals::OriginalInstanceCache;
pub use overrides::{DoubleSource, OverrideRegistry, WrapperMode};
pub use registry::{
    FACTORIES_SLOT, HostEnvironment, INSTANCES_SLOT, InMemoryRegistry, Registries,
    ServiceRegistry, TIMEZONE_SLOT, TRANSIENT_SLOT, Timezone, URL_GENERATOR_SLOT, UrlGenerator,
    resolve_as,
};
pub use slots::{SlotAccess, SlotTable, SlotValue};
pub use snapshot::{EXCLUDED_SLOTS, RegistriesSnapshot, RegistrySnapshot};

#[cfg(test)]
mod tests;
