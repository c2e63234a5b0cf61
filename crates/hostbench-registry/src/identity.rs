//! Object-identity indexed factory sets.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::factory::ServiceFactory;

/// Set of factories keyed by identity rather than by value.
#[derive(Clone, Default)]
pub struct IdentitySet {
    members: BTreeMap<usize, ServiceFactory>,
}

impl IdentitySet {
    /// Adds `factory`, returning `false` if it was already present.
    pub fn insert(&mut self, factory: ServiceFactory) -> bool {
        self.members.insert(factory.identity(), factory).is_none()
    }

    /// Removes `factory`, returning whether it was present.
    pub fn remove(&mut self, factory: &ServiceFactory) -> bool {
        self.members.remove(&factory.identity()).is_some()
    }

    /// Returns `true` when `factory` is a member.
    #[must_use]
    pub fn contains(&self, factory: &ServiceFactory) -> bool {
        self.members.contains_key(&factory.identity())
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` when the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    fn identities(&self) -> impl Iterator<Item = &usize> {
        self.members.keys()
    }
}

impl PartialEq for IdentitySet {
    fn eq(&self, other: &Self) -> bool {
        self.identities().eq(other.identities())
    }
}

impl Eq for IdentitySet {}

impl fmt::Debug for IdentitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.values()).finish()
    }
}

/// Identity set held by handle, as registries store it.
///
/// Cloning the handle aliases the set; [`Self::detached_copy`] produces an
/// independent container with the same members.
#[derive(Clone, Default)]
pub struct SharedIdentitySet(Arc<Mutex<IdentitySet>>);

impl SharedIdentitySet {
    /// Locks the set for reading or mutation.
    pub fn lock(&self) -> MutexGuard<'_, IdentitySet> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New container holding the same members.
    #[must_use]
    pub fn detached_copy(&self) -> Self {
        Self(Arc::new(Mutex::new(self.lock().clone())))
    }

    /// Returns `true` when both handles alias one container.
    #[must_use]
    pub fn is_same_container(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy of the current members.
    #[must_use]
    pub fn members(&self) -> IdentitySet {
        self.lock().clone()
    }
}

impl fmt::Debug for SharedIdentitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.members(), f)
    }
}
