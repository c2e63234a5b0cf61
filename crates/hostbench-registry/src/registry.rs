//! Host registry boundary and the in-memory reference registry.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::REGISTRY_TARGET;
use crate::error::RegistryError;
use crate::factory::{Lifetime, ServiceFactory, ServiceInstance};
use crate::id::ServiceId;
use crate::identity::SharedIdentitySet;
use crate::slots::{SlotAccess, SlotTable, SlotValue};

/// Slot holding registered factories.
pub const FACTORIES_SLOT: &str = "factories";
/// Slot holding cached shared instances.
pub const INSTANCES_SLOT: &str = "instances";
/// Slot holding the identity set of transient factories.
pub const TRANSIENT_SLOT: &str = "transient";
/// Slot holding the environment timezone provider.
pub const TIMEZONE_SLOT: &str = "timezone";
/// Slot holding the environment URL generator.
pub const URL_GENERATOR_SLOT: &str = "url_generator";

/// A service registry owned by the host runtime.
pub trait ServiceRegistry: SlotAccess + Send + Sync {
    /// Registry name used in diagnostics.
    fn name(&self) -> &str;

    /// Registers `factory` under `id`, evicting any cached instance.
    fn register(&self, id: ServiceId, factory: ServiceFactory, lifetime: Lifetime);

    /// Factory registered locally under `id`.
    fn factory(&self, id: &ServiceId) -> Option<ServiceFactory>;

    /// Instance cached locally under `id`.
    fn cached(&self, id: &ServiceId) -> Option<ServiceInstance>;

    /// Resolves `id`, building and caching it as its lifetime dictates.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServiceNotFound`] when nothing can provide
    /// the service, or the factory's own failure.
    fn resolve(&self, id: &ServiceId) -> Result<ServiceInstance, RegistryError>;
}

/// Resolves `id` and downcasts it to `T`.
///
/// # Errors
///
/// Returns the resolution failure, or [`RegistryError::TypeMismatch`] when
/// the instance is not a `T`.
pub fn resolve_as<T, R>(registry: &R, id: &ServiceId) -> Result<Arc<T>, RegistryError>
where
    T: Any + Send + Sync,
    R: ServiceRegistry + ?Sized,
{
    registry
        .resolve(id)?
        .downcast::<T>()
        .map_err(|_| RegistryError::TypeMismatch {
            id: id.clone(),
            expected: std::any::type_name::<T>(),
        })
}

/// Timezone the host environment runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timezone {
    name: String,
}

impl Timezone {
    /// Timezone called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Timezone name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builds absolute URLs for the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGenerator {
    base_url: String,
}

impl UrlGenerator {
    /// Generator rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Absolute URL of `route`.
    #[must_use]
    pub fn absolute(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

/// Settings the environment singletons are created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Timezone name.
    pub timezone: String,
    /// Base URL of the host.
    pub base_url: String,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            timezone: String::from("UTC"),
            base_url: String::from("http://localhost"),
        }
    }
}

impl HostEnvironment {
    fn timezone(&self) -> ServiceInstance {
        Arc::new(Timezone::new(self.timezone.clone()))
    }

    fn url_generator(&self) -> ServiceInstance {
        Arc::new(UrlGenerator::new(self.base_url.clone()))
    }
}

struct RegistryState {
    factories: BTreeMap<ServiceId, ServiceFactory>,
    instances: BTreeMap<ServiceId, ServiceInstance>,
    transient: SharedIdentitySet,
    timezone: ServiceInstance,
    url_generator: ServiceInstance,
}

/// Reference host registry with an explicit slot table.
///
/// Module registries carry a parent, normally the global registry, which
/// resolves identifiers they do not know.
pub struct InMemoryRegistry {
    name: String,
    environment: HostEnvironment,
    parent: Option<Arc<dyn ServiceRegistry>>,
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    /// Root registry called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_environment(name, HostEnvironment::default())
    }

    /// Root registry with explicit environment settings.
    #[must_use]
    pub fn with_environment(name: impl Into<String>, environment: HostEnvironment) -> Self {
        let state = RegistryState {
            factories: BTreeMap::new(),
            instances: BTreeMap::new(),
            transient: SharedIdentitySet::default(),
            timezone: environment.timezone(),
            url_generator: environment.url_generator(),
        };
        Self {
            name: name.into(),
            environment,
            parent: None,
            state: Mutex::new(state),
        }
    }

    /// Module registry delegating unknown identifiers to `parent`.
    #[must_use]
    pub fn child(name: impl Into<String>, parent: Arc<dyn ServiceRegistry>) -> Self {
        let mut registry = Self::new(name);
        registry.parent = Some(parent);
        registry
    }

    /// Timezone provider currently installed.
    #[must_use]
    pub fn timezone(&self) -> ServiceInstance {
        Arc::clone(&self.lock().timezone)
    }

    /// URL generator currently installed.
    #[must_use]
    pub fn url_generator(&self) -> ServiceInstance {
        Arc::clone(&self.lock().url_generator)
    }

    /// Returns `true` when `id`'s factory is in the transient identity set.
    #[must_use]
    pub fn is_transient(&self, id: &ServiceId) -> bool {
        let state = self.lock();
        state
            .factories
            .get(id)
            .is_some_and(|factory| state.transient.lock().contains(factory))
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServiceRegistry for InMemoryRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, id: ServiceId, factory: ServiceFactory, lifetime: Lifetime) {
        let mut state = self.lock();
        if let Some(previous) = state.factories.insert(id.clone(), factory.clone()) {
            state.transient.lock().remove(&previous);
        }
        state.instances.remove(&id);
        if lifetime == Lifetime::Transient {
            state.transient.lock().insert(factory);
        }
        debug!(
            target: REGISTRY_TARGET,
            registry = %self.name,
            service = %id,
            ?lifetime,
            "factory registered"
        );
    }

    fn factory(&self, id: &ServiceId) -> Option<ServiceFactory> {
        self.lock().factories.get(id).cloned()
    }

    fn cached(&self, id: &ServiceId) -> Option<ServiceInstance> {
        self.lock().instances.get(id).cloned()
    }

    fn resolve(&self, id: &ServiceId) -> Result<ServiceInstance, RegistryError> {
        let local = {
            let state = self.lock();
            if let Some(instance) = state.instances.get(id) {
                return Ok(Arc::clone(instance));
            }
            state.factories.get(id).map(|factory| {
                let transient = state.transient.lock().contains(factory);
                (factory.clone(), transient)
            })
        };

        // The factory runs unlocked: it may resolve other services here.
        let Some((factory, transient)) = local else {
            return match &self.parent {
                Some(parent) => parent.resolve(id),
                None => Err(RegistryError::ServiceNotFound {
                    id: id.clone(),
                    registry: self.name.clone(),
                }),
            };
        };
        let instance = factory.invoke()?;
        if transient {
            return Ok(instance);
        }
        let mut state = self.lock();
        Ok(Arc::clone(
            state.instances.entry(id.clone()).or_insert(instance),
        ))
    }
}

impl SlotAccess for InMemoryRegistry {
    fn export_slots(&self) -> SlotTable {
        let state = self.lock();
        SlotTable::from([
            (
                FACTORIES_SLOT.to_owned(),
                SlotValue::Factories(state.factories.clone()),
            ),
            (
                INSTANCES_SLOT.to_owned(),
                SlotValue::Instances(state.instances.clone()),
            ),
            (
                TRANSIENT_SLOT.to_owned(),
                SlotValue::Identities(state.transient.clone()),
            ),
            (
                TIMEZONE_SLOT.to_owned(),
                SlotValue::Object(Arc::clone(&state.timezone)),
            ),
            (
                URL_GENERATOR_SLOT.to_owned(),
                SlotValue::Object(Arc::clone(&state.url_generator)),
            ),
        ])
    }

    fn import_slots(&self, slots: SlotTable) {
        let mut state = self.lock();
        for (name, value) in slots {
            match (name.as_str(), value) {
                (FACTORIES_SLOT, SlotValue::Factories(factories)) => state.factories = factories,
                (INSTANCES_SLOT, SlotValue::Instances(instances)) => state.instances = instances,
                (TRANSIENT_SLOT, SlotValue::Identities(set)) => state.transient = set,
                (TIMEZONE_SLOT, SlotValue::Object(object)) => state.timezone = object,
                (URL_GENERATOR_SLOT, SlotValue::Object(object)) => state.url_generator = object,
                (other, value) => warn!(
                    target: REGISTRY_TARGET,
                    registry = %self.name,
                    slot = other,
                    ?value,
                    "ignoring unknown or mistyped slot"
                ),
            }
        }
    }

    fn fresh_slot(&self, name: &str) -> Option<SlotValue> {
        match name {
            TIMEZONE_SLOT => Some(SlotValue::Object(self.environment.timezone())),
            URL_GENERATOR_SLOT => Some(SlotValue::Object(self.environment.url_generator())),
            _ => None,
        }
    }
}

/// The global registry plus every module registry, as the harness sees them.
#[derive(Clone)]
pub struct Registries {
    global: Arc<dyn ServiceRegistry>,
    modules: BTreeMap<String, Arc<dyn ServiceRegistry>>,
}

impl Registries {
    /// Registries rooted at `global`.
    #[must_use]
    pub fn new(global: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            global,
            modules: BTreeMap::new(),
        }
    }

    /// Adds the registry owned by `module`.
    #[must_use]
    pub fn with_module(
        mut self,
        module: impl Into<String>,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Self {
        self.modules.insert(module.into(), registry);
        self
    }

    /// Process-wide registry.
    #[must_use]
    pub fn global(&self) -> &Arc<dyn ServiceRegistry> {
        &self.global
    }

    /// Registry owned by `module`.
    #[must_use]
    pub fn module(&self, module: &str) -> Option<&Arc<dyn ServiceRegistry>> {
        self.modules.get(module)
    }

    /// Every module registry with its module name.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &Arc<dyn ServiceRegistry>)> {
        self.modules
            .iter()
            .map(|(name, registry)| (name.as_str(), registry))
    }
}
