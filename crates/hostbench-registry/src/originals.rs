//! First-observed real instances of overridden services.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::factory::ServiceInstance;
use crate::id::ServiceId;

/// Maps each identifier to the first real instance seen for it.
///
/// Recording is first-observation-wins: later observations return the stored
/// instance and are otherwise ignored. Entries live until [`Self::clear`],
/// which the harness calls between suites.
#[derive(Debug, Default)]
pub struct OriginalInstanceCache {
    entries: Mutex<BTreeMap<ServiceId, ServiceInstance>>,
}

impl OriginalInstanceCache {
    /// Stored original for `id`.
    #[must_use]
    pub fn get(&self, id: &ServiceId) -> Option<ServiceInstance> {
        self.lock().get(id).cloned()
    }

    /// Records `instance` unless an original is already known, returning
    /// the stored original.
    pub fn record(&self, id: &ServiceId, instance: ServiceInstance) -> ServiceInstance {
        Arc::clone(self.lock().entry(id.clone()).or_insert(instance))
    }

    /// Returns `true` when an original is known for `id`.
    #[must_use]
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of recorded originals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets every original.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ServiceId, ServiceInstance>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
