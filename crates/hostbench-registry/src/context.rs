//! Harness session state shared by every test case of a suite.

use std::sync::{Mutex, MutexGuard, PoisonError};

use hostbench_config::HarnessConfig;
use tracing::info;

use crate::REGISTRY_TARGET;
use crate::overrides::OverrideRegistry;
use crate::registry::Registries;
use crate::snapshot::RegistriesSnapshot;

/// Whether the session has captured its clean baseline yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No baseline captured.
    Uninitialised,
    /// Baseline captured; overrides may be installed.
    Active,
}

/// What [`HarnessContext::begin_case`] did to the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineAction {
    /// The registries were captured as the suite baseline.
    Captured,
    /// The registries were rolled back to the suite baseline.
    Restored,
}

/// Session object owning the registry baseline and the override registry.
///
/// The first case of a suite captures the baseline; every later case rolls
/// the registries back to it, so each case starts from the first clean state
/// observed. [`Self::reset_suite`] restores the baseline one final time and
/// forgets everything, including recorded original instances.
pub struct HarnessContext {
    overrides: OverrideRegistry,
    baseline: Mutex<Option<RegistriesSnapshot>>,
}

impl HarnessContext {
    /// Context for a suite testing `module_under_test`.
    #[must_use]
    pub fn new(module_under_test: impl Into<String>) -> Self {
        Self {
            overrides: OverrideRegistry::new(module_under_test),
            baseline: Mutex::new(None),
        }
    }

    /// Context configured from [`HarnessConfig::module_under_test`].
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.module_under_test.clone())
    }

    /// Override registry of this session.
    #[must_use]
    pub const fn overrides(&self) -> &OverrideRegistry {
        &self.overrides
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContextState {
        if self.lock().is_some() {
            ContextState::Active
        } else {
            ContextState::Uninitialised
        }
    }

    /// Captures the baseline on first use and restores it afterwards, then
    /// clears per-case overrides.
    pub fn begin_case(&self, registries: &Registries) -> BaselineAction {
        let action = {
            let mut baseline = self.lock();
            match baseline.as_ref() {
                Some(snapshot) => {
                    snapshot.restore(registries);
                    BaselineAction::Restored
                }
                None => {
                    *baseline = Some(RegistriesSnapshot::capture(registries));
                    BaselineAction::Captured
                }
            }
        };
        self.overrides.begin_case();
        info!(
            target: REGISTRY_TARGET,
            ?action,
            module_under_test = self.overrides.module_under_test(),
            "test case registry baseline ready"
        );
        action
    }

    /// Restores the baseline, then forgets it together with every override,
    /// original instance and captured factory.
    pub fn reset_suite(&self, registries: &Registries) {
        if let Some(snapshot) = self.lock().take() {
            snapshot.restore(registries);
        }
        self.overrides.reset();
        info!(target: REGISTRY_TARGET, "harness suite state reset");
    }

    /// Captured baseline, if any.
    #[must_use]
    pub fn baseline(&self) -> Option<RegistriesSnapshot> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<RegistriesSnapshot>> {
        self.baseline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
