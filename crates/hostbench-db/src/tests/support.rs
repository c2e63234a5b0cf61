//! Shared fixtures and doubles for the manager suites.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hostbench_config::HarnessConfig;
use mockall::mock;
use tempfile::TempDir;

use crate::error::DatabaseError;
use crate::health::LifecycleReporter;
use crate::manager::DatabaseManager;
use crate::session::ServerDescriptor;
use crate::test_support::{FixedToolLocator, ScriptedRunner};
use crate::tools::{ToolKind, ToolLocator};

mock! {
    pub Locator {}
    impl ToolLocator for Locator {
        fn locate(&self, tool: ToolKind) -> Result<PathBuf, DatabaseError>;
    }
}

/// Lifecycle events captured during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Starting,
    Ready { pid: u32 },
    Failed(String),
    Stopped(PathBuf),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn server_starting(&self) {
        self.record(LifecycleEvent::Starting);
    }

    fn server_ready(&self, _descriptor: &ServerDescriptor, pid: u32) {
        self.record(LifecycleEvent::Ready { pid });
    }

    fn server_failed(&self, error: &DatabaseError) {
        self.record(LifecycleEvent::Failed(error.to_string()));
    }

    fn server_stopped(&self, directory: &Path) {
        self.record(LifecycleEvent::Stopped(directory.to_path_buf()));
    }
}

/// Configuration with budgets small enough for failing scenarios to finish
/// quickly.
pub fn quick_config(artifacts: &Path) -> HarnessConfig {
    HarnessConfig {
        artifacts_dir: artifacts.to_path_buf(),
        log_wait_iterations: 20,
        log_wait_interval_us: 100,
        ready_poll_interval_ms: 20,
        ready_iterations: 3,
        ..HarnessConfig::default()
    }
}

/// Manager wired to a scripted runner, with the handles tests inspect.
pub struct Harness {
    pub manager: DatabaseManager<ScriptedRunner, FixedToolLocator>,
    pub runner: ScriptedRunner,
    pub reporter: Arc<RecordingReporter>,
    pub artifacts: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let artifacts = TempDir::new().expect("artifacts dir");
        let runner = ScriptedRunner::new();
        let reporter = Arc::new(RecordingReporter::default());
        let manager = DatabaseManager::new(
            quick_config(artifacts.path()),
            runner.clone(),
            FixedToolLocator::default(),
        )
        .with_reporter(reporter.clone());
        Self {
            manager,
            runner,
            reporter,
            artifacts,
        }
    }
}
