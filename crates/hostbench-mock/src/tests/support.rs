//! Shared provider fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hostbench_registry::{
    HarnessContext, InMemoryRegistry, Lifetime, Registries, ServiceFactory, ServiceId,
    ServiceRegistry,
};

use crate::catalogue::SESSION;

pub const MODULE_UNDER_TEST: &str = "app";
pub const MAILER: ServiceId = ServiceId::from_static("app::Mailer");

/// Session object the host builds when no double intervenes.
#[derive(Debug, PartialEq, Eq)]
pub struct RealSession(pub usize);

/// A host with a global registry holding a counting real session factory
/// and an `app` registry for the module under test.
pub struct Host {
    pub global: Arc<InMemoryRegistry>,
    pub app: Arc<InMemoryRegistry>,
    pub registries: Registries,
    pub context: Arc<HarnessContext>,
    session_builds: Arc<AtomicUsize>,
}

impl Host {
    pub fn new() -> Self {
        let global = Arc::new(InMemoryRegistry::new("global"));
        let app = Arc::new(InMemoryRegistry::child(
            MODULE_UNDER_TEST,
            global.clone() as Arc<dyn ServiceRegistry>,
        ));
        let session_builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&session_builds);
        global.register(
            SESSION,
            ServiceFactory::from_fn(move || RealSession(counter.fetch_add(1, Ordering::SeqCst))),
            Lifetime::Shared,
        );
        let registries = Registries::new(global.clone()).with_module(MODULE_UNDER_TEST, app.clone());
        Self {
            global,
            app,
            registries,
            context: Arc::new(HarnessContext::new(MODULE_UNDER_TEST)),
            session_builds,
        }
    }

    pub fn session_builds(&self) -> usize {
        self.session_builds.load(Ordering::SeqCst)
    }
}
