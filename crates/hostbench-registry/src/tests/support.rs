//! Shared registry fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::factory::{Lifetime, ServiceFactory};
use crate::id::ServiceId;
use crate::registry::{InMemoryRegistry, Registries, ServiceRegistry};

pub const MODULE_UNDER_TEST: &str = "app";
pub const SESSION: ServiceId = ServiceId::from_static("host::Session");
pub const STORAGE: ServiceId = ServiceId::from_static("files::Storage");
pub const MAILER: ServiceId = ServiceId::from_static("app::Mailer");

/// Real session object produced by the host factory.
#[derive(Debug, PartialEq, Eq)]
pub struct RealSession(pub usize);

/// Double standing in for [`RealSession`].
#[derive(Debug, PartialEq, Eq)]
pub struct FakeSession;

/// A global registry, the module under test's registry and a foreign
/// `files` registry, with a counting real factory for [`SESSION`] and
/// [`STORAGE`].
pub struct Host {
    pub global: Arc<InMemoryRegistry>,
    pub app: Arc<InMemoryRegistry>,
    pub files: Arc<InMemoryRegistry>,
    pub registries: Registries,
    pub session_builds: Arc<AtomicUsize>,
}

impl Host {
    pub fn new() -> Self {
        let global = Arc::new(InMemoryRegistry::new("global"));
        let app = Arc::new(InMemoryRegistry::child(
            MODULE_UNDER_TEST,
            global.clone() as Arc<dyn ServiceRegistry>,
        ));
        let files = Arc::new(InMemoryRegistry::child(
            "files",
            global.clone() as Arc<dyn ServiceRegistry>,
        ));
        let session_builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&session_builds);
        global.register(
            SESSION,
            ServiceFactory::from_fn(move || RealSession(counter.fetch_add(1, Ordering::SeqCst))),
            Lifetime::Shared,
        );
        files.register(
            STORAGE,
            ServiceFactory::from_fn(|| String::from("local storage")),
            Lifetime::Shared,
        );
        let registries = Registries::new(global.clone())
            .with_module(MODULE_UNDER_TEST, app.clone())
            .with_module("files", files.clone());
        Self {
            global,
            app,
            files,
            registries,
            session_builds,
        }
    }

    pub fn session_builds(&self) -> usize {
        self.session_builds.load(Ordering::SeqCst)
    }
}
