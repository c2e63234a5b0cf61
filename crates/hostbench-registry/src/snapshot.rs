//! Point-in-time copies of registry slot tables.

use std::collections::BTreeMap;

use tracing::debug;

use crate::REGISTRY_TARGET;
use crate::registry::{Registries, TIMEZONE_SLOT, URL_GENERATOR_SLOT};
use crate::slots::{SlotAccess, SlotTable};

/// Environment slots never carried by a snapshot; restoring recreates them.
pub const EXCLUDED_SLOTS: [&str; 2] = [TIMEZONE_SLOT, URL_GENERATOR_SLOT];

/// Copy of one registry's slot table.
///
/// Capturing does not touch the live registry: cached instances stay shared
/// between the registry and the snapshot, while the tables themselves and
/// every identity set are independent, so later registrations on either side
/// are invisible to the other.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    slots: SlotTable,
}

impl RegistrySnapshot {
    /// Captures `registry`'s slots.
    #[must_use]
    pub fn capture<R: SlotAccess + ?Sized>(registry: &R) -> Self {
        let slots = registry
            .export_slots()
            .into_iter()
            .filter(|(name, _)| !is_excluded(name))
            .map(|(name, value)| (name, value.snapshot_copy()))
            .collect();
        Self { slots }
    }

    /// Writes the captured slots back into `registry`, with fresh values for
    /// the excluded environment slots.
    ///
    /// The snapshot stays reusable: identity sets are copied again on the
    /// way out so the live registry never aliases the snapshot's containers.
    pub fn restore_into<R: SlotAccess + ?Sized>(&self, registry: &R) {
        let mut slots: SlotTable = self
            .slots
            .iter()
            .map(|(name, value)| (name.clone(), value.snapshot_copy()))
            .collect();
        for name in EXCLUDED_SLOTS {
            if let Some(value) = registry.fresh_slot(name) {
                slots.insert(name.to_owned(), value);
            }
        }
        registry.import_slots(slots);
    }

    /// Captured slots.
    #[must_use]
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_SLOTS.contains(&name)
}

/// Snapshot of the global registry and every module registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistriesSnapshot {
    global: RegistrySnapshot,
    modules: BTreeMap<String, RegistrySnapshot>,
}

impl RegistriesSnapshot {
    /// Captures every registry in `registries`.
    #[must_use]
    pub fn capture(registries: &Registries) -> Self {
        let global = RegistrySnapshot::capture(registries.global().as_ref());
        let modules = registries
            .modules()
            .map(|(name, registry)| (name.to_owned(), RegistrySnapshot::capture(registry.as_ref())))
            .collect();
        Self { global, modules }
    }

    /// Restores every captured registry. Module registries that appeared
    /// after the capture are left alone.
    pub fn restore(&self, registries: &Registries) {
        self.global.restore_into(registries.global().as_ref());
        for (name, registry) in registries.modules() {
            match self.modules.get(name) {
                Some(snapshot) => snapshot.restore_into(registry.as_ref()),
                None => debug!(
                    target: REGISTRY_TARGET,
                    module = name,
                    "module registry not in baseline; leaving it untouched"
                ),
            }
        }
    }

    /// Snapshot of the global registry.
    #[must_use]
    pub const fn global(&self) -> &RegistrySnapshot {
        &self.global
    }

    /// Snapshot of `module`'s registry.
    #[must_use]
    pub fn module(&self, module: &str) -> Option<&RegistrySnapshot> {
        self.modules.get(module)
    }
}
