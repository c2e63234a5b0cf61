//! Shared session fixtures.

use std::sync::Arc;

use hostbench_db::DatabaseManager;
use hostbench_db::test_support::{FixedToolLocator, ScriptedRunner};
use hostbench_registry::{InMemoryRegistry, Lifetime, Registries, ServiceFactory, ServiceRegistry};
use tempfile::TempDir;

use crate::catalogue::SESSION;
use crate::{HarnessConfig, HarnessSession};

/// Session object the host builds when no double intervenes.
#[derive(Debug)]
pub struct RealSession;

pub fn quick_config(artifacts: &TempDir) -> HarnessConfig {
    HarnessConfig {
        artifacts_dir: artifacts.path().to_path_buf(),
        log_wait_iterations: 20,
        log_wait_interval_us: 100,
        ready_poll_interval_ms: 20,
        ready_iterations: 3,
        cloud_password: String::from("cloudpw"),
        ..HarnessConfig::default()
    }
}

pub fn host_registries() -> (Arc<InMemoryRegistry>, Registries) {
    let global = Arc::new(InMemoryRegistry::new("global"));
    global.register(
        SESSION,
        ServiceFactory::from_fn(|| RealSession),
        Lifetime::Shared,
    );
    let app = Arc::new(InMemoryRegistry::child(
        "app",
        global.clone() as Arc<dyn ServiceRegistry>,
    ));
    let registries = Registries::new(global.clone()).with_module("app", app);
    (global, registries)
}

/// A session over scripted database tools.
pub struct Fixture {
    pub session: HarnessSession<ScriptedRunner, FixedToolLocator>,
    pub runner: ScriptedRunner,
    pub global: Arc<InMemoryRegistry>,
    pub artifacts: TempDir,
}

impl Fixture {
    pub fn open() -> Self {
        let artifacts = TempDir::new().expect("artifacts dir");
        let runner = ScriptedRunner::new();
        let manager = DatabaseManager::new(
            quick_config(&artifacts),
            runner.clone(),
            FixedToolLocator::default(),
        );
        let (global, registries) = host_registries();
        let session = HarnessSession::open(manager, registries).expect("session opens");
        Self {
            session,
            runner,
            global,
            artifacts,
        }
    }
}
