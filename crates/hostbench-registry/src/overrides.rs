//! Service overrides installed into live registries.
//!
//! An override is a wrapper factory registered under the overridden
//! identifier. For services of the module under test the wrapper only ever
//! serves test doubles. For every other service it prefers a double, then
//! the first real instance observed for the identifier, then the real
//! factory captured before the override went in. The same wrapper is
//! installed into each registry that could resolve the identifier, so every
//! lookup path observes one decision.
//!
//! Wrappers are always registered as transient so registries never pin a
//! double in their own instance cache, and they are tracked by identity so a
//! wrapper is never mistaken for the real factory it replaced.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::OVERRIDES_TARGET;
use crate::error::RegistryError;
use crate::factory::{Lifetime, ServiceFactory, ServiceInstance};
use crate::id::ServiceId;
use crate::identity::IdentitySet;
use crate::originals::OriginalInstanceCache;
use crate::registry::{Registries, ServiceRegistry};

/// Lazily builds the test double for one identifier. `None` means the
/// catalogue has nothing to offer for it.
pub type DoubleSource = Arc<dyn Fn() -> Option<ServiceInstance> + Send + Sync>;

/// How an installed wrapper resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperMode {
    /// Serve doubles only.
    DoubleOnly,
    /// Double, then original instance, then real factory.
    Fallback,
}

#[derive(Default)]
struct OverrideState {
    module_under_test: String,
    class_instances: Mutex<BTreeMap<ServiceId, Option<ServiceInstance>>>,
    catalogue: Mutex<BTreeMap<ServiceId, DoubleSource>>,
    originals: OriginalInstanceCache,
    real_factories: Mutex<BTreeMap<ServiceId, ServiceFactory>>,
    wrappers: Mutex<BTreeMap<ServiceId, ServiceFactory>>,
    wrapper_identities: Mutex<IdentitySet>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OverrideState {
    /// The live double lookup.
    ///
    /// A per-case entry wins over the catalogue, and a cleared entry hides
    /// the catalogue for that identifier.
    fn double(&self, id: &ServiceId) -> Option<ServiceInstance> {
        if let Some(entry) = lock(&self.class_instances).get(id) {
            return entry.clone();
        }
        let source = lock(&self.catalogue).get(id).cloned()?;
        source()
    }

    fn resolve(&self, id: &ServiceId, mode: WrapperMode) -> Result<ServiceInstance, RegistryError> {
        if let Some(double) = self.double(id) {
            return Ok(double);
        }
        let not_found = || RegistryError::ServiceNotFound {
            id: id.clone(),
            registry: String::from("overrides"),
        };
        if mode == WrapperMode::DoubleOnly {
            return Err(not_found());
        }
        if let Some(original) = self.originals.get(id) {
            return Ok(original);
        }
        let real = lock(&self.real_factories).get(id).cloned();
        match real {
            Some(factory) => {
                let instance = factory.invoke()?;
                debug!(
                    target: OVERRIDES_TARGET,
                    service = %id,
                    "original instance built from real factory"
                );
                Ok(self.originals.record(id, instance))
            }
            None => Err(not_found()),
        }
    }

    fn is_wrapper(&self, factory: &ServiceFactory) -> bool {
        lock(&self.wrapper_identities).contains(factory)
    }
}

/// Installs and answers service overrides for one harness session.
#[derive(Clone)]
pub struct OverrideRegistry {
    state: Arc<OverrideState>,
}

impl OverrideRegistry {
    /// Override registry for a session testing `module_under_test`.
    #[must_use]
    pub fn new(module_under_test: impl Into<String>) -> Self {
        Self {
            state: Arc::new(OverrideState {
                module_under_test: module_under_test.into(),
                ..OverrideState::default()
            }),
        }
    }

    /// Module whose services are replaced outright.
    #[must_use]
    pub fn module_under_test(&self) -> &str {
        &self.state.module_under_test
    }

    /// Wrapper mode applied to `id`.
    #[must_use]
    pub fn mode_for(&self, id: &ServiceId) -> WrapperMode {
        if id.module() == self.state.module_under_test {
            WrapperMode::DoubleOnly
        } else {
            WrapperMode::Fallback
        }
    }

    /// Adds `source` to the double catalogue for `id`.
    pub fn set_double_source(&self, id: ServiceId, source: DoubleSource) {
        lock(&self.state.catalogue).insert(id, source);
    }

    /// Current test double for `id`, if any.
    #[must_use]
    pub fn double(&self, id: &ServiceId) -> Option<ServiceInstance> {
        self.state.double(id)
    }

    /// Resolves `id` the way an installed wrapper would.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServiceNotFound`] when no double, original
    /// or real factory is available, or the real factory's failure.
    pub fn resolve(&self, id: &ServiceId) -> Result<ServiceInstance, RegistryError> {
        self.state.resolve(id, self.mode_for(id))
    }

    /// Original instance recorded for `id`.
    #[must_use]
    pub fn original(&self, id: &ServiceId) -> Option<ServiceInstance> {
        self.state.originals.get(id)
    }

    /// Returns `true` when `factory` is one of this registry's wrappers.
    #[must_use]
    pub fn is_wrapper(&self, factory: &ServiceFactory) -> bool {
        self.state.is_wrapper(factory)
    }

    /// Installs the override for `id` into every registry that could
    /// resolve it.
    ///
    /// Services of the module under test are overridden in that module's
    /// registry only. Foreign services first have their real factory and
    /// any cached instance captured, then the wrapper goes into the module
    /// under test's registry, the global registry and the owning module's
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ModuleNotFound`] when the module under test
    /// has no registry and the service belongs to it.
    pub fn register_service(
        &self,
        registries: &Registries,
        id: &ServiceId,
    ) -> Result<(), RegistryError> {
        let module_under_test = self.module_under_test();
        let mode = self.mode_for(id);
        let wrapper = self.wrapper_for(id, mode);

        if mode == WrapperMode::DoubleOnly {
            let registry =
                registries
                    .module(module_under_test)
                    .ok_or_else(|| RegistryError::ModuleNotFound {
                        module: module_under_test.to_owned(),
                    })?;
            registry.register(id.clone(), wrapper, Lifetime::Transient);
            debug!(
                target: OVERRIDES_TARGET,
                service = %id,
                registry = registry.name(),
                "installed double-only override"
            );
            return Ok(());
        }

        let foreign = registries
            .module(id.module())
            .filter(|_| id.module() != module_under_test);
        self.capture_real(id, foreign.into_iter().chain([registries.global()]));

        let targets = registries
            .module(module_under_test)
            .into_iter()
            .chain([registries.global()])
            .chain(foreign);
        for registry in targets {
            registry.register(id.clone(), wrapper.clone(), Lifetime::Transient);
            debug!(
                target: OVERRIDES_TARGET,
                service = %id,
                registry = registry.name(),
                "installed fallback override"
            );
        }
        Ok(())
    }

    /// Records the per-case instance for `id`, or clears it with `None`.
    ///
    /// A cleared entry means "no double": resolution falls through to the
    /// original even if the catalogue could build a double. With `global`
    /// set the override is also installed into the shared registries.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::register_service`] failures.
    pub fn register_class_instance(
        &self,
        registries: &Registries,
        id: &ServiceId,
        instance: Option<ServiceInstance>,
        global: bool,
    ) -> Result<(), RegistryError> {
        lock(&self.state.class_instances).insert(id.clone(), instance);
        if global {
            self.register_service(registries, id)?;
        }
        Ok(())
    }

    /// Forgets every per-case instance. Catalogue sources, originals and
    /// captured factories survive.
    pub fn begin_case(&self) {
        lock(&self.state.class_instances).clear();
    }

    /// Forgets all state, ready for a new suite.
    pub fn reset(&self) {
        lock(&self.state.class_instances).clear();
        lock(&self.state.catalogue).clear();
        lock(&self.state.real_factories).clear();
        lock(&self.state.wrappers).clear();
        lock(&self.state.wrapper_identities).clear();
        self.state.originals.clear();
    }

    fn capture_real<'a>(
        &self,
        id: &ServiceId,
        candidates: impl Iterator<Item = &'a Arc<dyn ServiceRegistry>> + Clone,
    ) {
        let mut real_factories = lock(&self.state.real_factories);
        if !real_factories.contains_key(id)
            && let Some(factory) = candidates
                .clone()
                .filter_map(|registry| registry.factory(id))
                .find(|factory| !self.state.is_wrapper(factory))
        {
            real_factories.insert(id.clone(), factory);
        }
        drop(real_factories);

        if let Some(instance) = candidates.filter_map(|registry| registry.cached(id)).next() {
            self.state.originals.record(id, instance);
        }
    }

    fn wrapper_for(&self, id: &ServiceId, mode: WrapperMode) -> ServiceFactory {
        let mut wrappers = lock(&self.state.wrappers);
        if let Some(existing) = wrappers.get(id) {
            return existing.clone();
        }
        let state: Weak<OverrideState> = Arc::downgrade(&self.state);
        let wrapped = id.clone();
        let wrapper = ServiceFactory::new(move || match state.upgrade() {
            Some(state) => state.resolve(&wrapped, mode),
            None => Err(RegistryError::HarnessDropped {
                id: wrapped.clone(),
            }),
        });
        wrappers.insert(id.clone(), wrapper.clone());
        lock(&self.state.wrapper_identities).insert(wrapper.clone());
        wrapper
    }
}
