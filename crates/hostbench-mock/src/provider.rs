//! Composition root handing test code its doubles.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use hostbench_registry::{
    BaselineAction, HarnessContext, Registries, RegistryError, ServiceId, ServiceInstance,
    ServiceRegistry, resolve_as,
};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::PROVIDER_TARGET;
use crate::catalogue::{
    CATALOGUE, CONFIG_STORE, CREDENTIALS_STORE, LOCALISATION, REQUEST, SESSION, USER,
    USER_SESSION,
};
use crate::doubles::{
    ConfigFallback, FakeConfigStore, FakeCredentialsStore, FakeLocalisation, FakeRequest,
    FakeSession, FakeUser, FakeUserSession, NoFallback, RequestParams,
};

/// Password seeded into the credentials store for the signed-in user.
pub const DEFAULT_PASSWORD: &str = "password";

/// Collects the choices a test makes before its provider is built.
pub struct MockProviderBuilder {
    context: Arc<HarnessContext>,
    registries: Registries,
    user: FakeUser,
    request: RequestParams,
    fallback: Arc<dyn ConfigFallback>,
    language: String,
    password: String,
    extra_services: Vec<ServiceId>,
}

impl MockProviderBuilder {
    /// Runs the test as `user`.
    #[must_use]
    pub fn with_user(mut self, user: FakeUser) -> Self {
        self.user = user;
        self
    }

    /// Builds the request double from `request`.
    #[must_use]
    pub fn with_request(mut self, request: RequestParams) -> Self {
        self.request = request;
        self
    }

    /// Consults `fallback` when the config store misses.
    #[must_use]
    pub fn with_config_fallback(mut self, fallback: Arc<dyn ConfigFallback>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Reports `language` from the localisation double.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Seeds the credentials store with `password` for the signed-in user.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Also overrides `id`, served by per-case instances registered through
    /// [`MockProvider::register_class_instance`].
    #[must_use]
    pub fn override_service(mut self, id: ServiceId) -> Self {
        self.extra_services.push(id);
        self
    }

    /// Rolls the registries back to the suite baseline (capturing it on
    /// first use), then installs the catalogue overrides.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ModuleNotFound`] when an overridden service
    /// belongs to the module under test and that module has no registry.
    pub fn build(self) -> Result<MockProvider, RegistryError> {
        let baseline = self.context.begin_case(&self.registries);
        let inner = Arc::new(ProviderInner {
            context: self.context,
            registries: self.registries,
            user_template: self.user,
            request_template: self.request,
            fallback: self.fallback,
            language: self.language,
            password: self.password,
            user: OnceCell::new(),
            session: OnceCell::new(),
            request: OnceCell::new(),
            user_session: OnceCell::new(),
            credentials: OnceCell::new(),
            config: OnceCell::new(),
            localisation: OnceCell::new(),
        });

        let overrides = inner.context.overrides();
        for id in &CATALOGUE {
            let provider = Arc::downgrade(&inner);
            let served = id.clone();
            overrides.set_double_source(
                id.clone(),
                Arc::new(move || {
                    Weak::upgrade(&provider).and_then(|provider| provider.double_for(&served))
                }),
            );
            overrides.register_service(&inner.registries, id)?;
        }
        for id in &self.extra_services {
            overrides.register_service(&inner.registries, id)?;
        }
        info!(
            target: PROVIDER_TARGET,
            ?baseline,
            services = CATALOGUE.len() + self.extra_services.len(),
            "mock provider ready"
        );
        Ok(MockProvider { inner, baseline })
    }
}

struct ProviderInner {
    context: Arc<HarnessContext>,
    registries: Registries,
    user_template: FakeUser,
    request_template: RequestParams,
    fallback: Arc<dyn ConfigFallback>,
    language: String,
    password: String,
    user: OnceCell<Arc<FakeUser>>,
    session: OnceCell<Arc<FakeSession>>,
    request: OnceCell<Arc<FakeRequest>>,
    user_session: OnceCell<Arc<FakeUserSession>>,
    credentials: OnceCell<Arc<FakeCredentialsStore>>,
    config: OnceCell<Arc<FakeConfigStore>>,
    localisation: OnceCell<Arc<FakeLocalisation>>,
}

impl ProviderInner {
    fn user(&self) -> &Arc<FakeUser> {
        self.user
            .get_or_init(|| Arc::new(self.user_template.clone()))
    }

    fn session(&self) -> &Arc<FakeSession> {
        self.session.get_or_init(|| {
            let session = FakeSession::default();
            session.set("user_id", self.user().uid());
            Arc::new(session)
        })
    }

    fn request(&self) -> &Arc<FakeRequest> {
        self.request
            .get_or_init(|| Arc::new(FakeRequest::new(self.request_template.clone())))
    }

    fn user_session(&self) -> &Arc<FakeUserSession> {
        self.user_session.get_or_init(|| {
            Arc::new(FakeUserSession::new(
                Arc::clone(self.user()),
                Arc::clone(self.session()),
            ))
        })
    }

    fn credentials(&self) -> &Arc<FakeCredentialsStore> {
        self.credentials.get_or_init(|| {
            let store = FakeCredentialsStore::default();
            let uid = self.user().uid();
            store.store(uid, uid, &self.password);
            Arc::new(store)
        })
    }

    fn config(&self) -> &Arc<FakeConfigStore> {
        self.config
            .get_or_init(|| Arc::new(FakeConfigStore::new(Arc::clone(&self.fallback))))
    }

    fn localisation(&self) -> &Arc<FakeLocalisation> {
        self.localisation
            .get_or_init(|| Arc::new(FakeLocalisation::new(self.language.clone())))
    }

    fn double_for(&self, id: &ServiceId) -> Option<ServiceInstance> {
        let instance: ServiceInstance = match id.as_str() {
            name if name == USER.as_str() => self.user().clone(),
            name if name == REQUEST.as_str() => self.request().clone(),
            name if name == SESSION.as_str() => self.session().clone(),
            name if name == USER_SESSION.as_str() => self.user_session().clone(),
            name if name == CONFIG_STORE.as_str() => self.config().clone(),
            name if name == LOCALISATION.as_str() => self.localisation().clone(),
            name if name == CREDENTIALS_STORE.as_str() => self.credentials().clone(),
            _ => return None,
        };
        debug!(target: PROVIDER_TARGET, service = %id, "served catalogue double");
        Some(instance)
    }

    fn app_container(&self) -> &Arc<dyn ServiceRegistry> {
        let module = self.context.overrides().module_under_test();
        self.registries
            .module(module)
            .unwrap_or_else(|| self.registries.global())
    }
}

/// Doubles for one test case, installed over the host's registries.
///
/// Every accessor builds its double on first use and returns the same
/// instance afterwards; the registries serve those same instances. Dropping
/// the provider detaches the doubles, after which overridden services fall
/// back to their original instances.
pub struct MockProvider {
    inner: Arc<ProviderInner>,
    baseline: BaselineAction,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("baseline", &self.baseline)
            .field("user", &self.inner.user_template.uid())
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    /// Starts building a provider over `registries`.
    #[must_use]
    pub fn builder(context: Arc<HarnessContext>, registries: Registries) -> MockProviderBuilder {
        MockProviderBuilder {
            context,
            registries,
            user: FakeUser::default(),
            request: RequestParams::default(),
            fallback: Arc::new(NoFallback),
            language: String::from("en"),
            password: String::from(DEFAULT_PASSWORD),
            extra_services: Vec::new(),
        }
    }

    /// Provider with every default choice.
    ///
    /// # Errors
    ///
    /// See [`MockProviderBuilder::build`].
    pub fn new(context: Arc<HarnessContext>, registries: Registries) -> Result<Self, RegistryError> {
        Self::builder(context, registries).build()
    }

    /// Whether construction captured or restored the suite baseline.
    #[must_use]
    pub const fn baseline(&self) -> BaselineAction {
        self.baseline
    }

    /// Signed-in user.
    #[must_use]
    pub fn get_user(&self) -> Arc<FakeUser> {
        Arc::clone(self.inner.user())
    }

    /// Session of the signed-in user.
    #[must_use]
    pub fn get_session(&self) -> Arc<FakeSession> {
        Arc::clone(self.inner.session())
    }

    /// Current request.
    #[must_use]
    pub fn get_request(&self) -> Arc<FakeRequest> {
        Arc::clone(self.inner.request())
    }

    /// Login state over the user and session doubles.
    #[must_use]
    pub fn get_user_session(&self) -> Arc<FakeUserSession> {
        Arc::clone(self.inner.user_session())
    }

    /// Credentials store seeded with the signed-in user's login.
    #[must_use]
    pub fn get_credentials_store(&self) -> Arc<FakeCredentialsStore> {
        Arc::clone(self.inner.credentials())
    }

    /// Configuration store.
    #[must_use]
    pub fn get_cloud_config(&self) -> Arc<FakeConfigStore> {
        Arc::clone(self.inner.config())
    }

    /// Localisation.
    #[must_use]
    pub fn get_localisation(&self) -> Arc<FakeLocalisation> {
        Arc::clone(self.inner.localisation())
    }

    /// Registry of the module under test, or the global registry when the
    /// module has none.
    #[must_use]
    pub fn get_app_container(&self) -> Arc<dyn ServiceRegistry> {
        Arc::clone(self.inner.app_container())
    }

    /// Records a per-case instance for `id`, or clears it with `None`.
    ///
    /// # Errors
    ///
    /// Propagates override installation failures when `global` is set.
    pub fn register_class_instance(
        &self,
        id: &ServiceId,
        instance: Option<ServiceInstance>,
        global: bool,
    ) -> Result<(), RegistryError> {
        self.inner.context.overrides().register_class_instance(
            &self.inner.registries,
            id,
            instance,
            global,
        )
    }

    /// Resolves `id` the way application code in the module under test
    /// would.
    ///
    /// # Errors
    ///
    /// Returns the registry's resolution failure.
    pub fn resolve(&self, id: &ServiceId) -> Result<ServiceInstance, RegistryError> {
        self.inner.app_container().resolve(id)
    }

    /// Resolves `id` and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Returns the resolution failure or [`RegistryError::TypeMismatch`].
    pub fn resolve_as<T: Any + Send + Sync>(&self, id: &ServiceId) -> Result<Arc<T>, RegistryError> {
        resolve_as::<T, _>(self.inner.app_container().as_ref(), id)
    }
}
