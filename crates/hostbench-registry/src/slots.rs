//! Administrative access to a registry's internal slot table.
//!
//! Host registries do not let the harness reach into their internals by
//! introspection. Instead they implement [`SlotAccess`], an explicit
//! test-only contract for exporting and re-importing every named slot.

use std::collections::BTreeMap;
use std::fmt;

use crate::factory::{ServiceFactory, ServiceInstance, same_instance};
use crate::id::ServiceId;
use crate::identity::SharedIdentitySet;

/// Content of one named slot.
#[derive(Clone)]
pub enum SlotValue {
    /// Registered factories.
    Factories(BTreeMap<ServiceId, ServiceFactory>),
    /// Cached shared instances.
    Instances(BTreeMap<ServiceId, ServiceInstance>),
    /// Object-identity indexed set, held by handle.
    Identities(SharedIdentitySet),
    /// A single environment object.
    Object(ServiceInstance),
}

impl SlotValue {
    /// Copy used for snapshots: identity sets become independent containers
    /// with the same members, everything else is cloned by value and keeps
    /// referring to the same instances.
    #[must_use]
    pub fn snapshot_copy(&self) -> Self {
        match self {
            Self::Identities(set) => Self::Identities(set.detached_copy()),
            other => other.clone(),
        }
    }
}

/// Slots compare by what resolution can observe: factories and instances by
/// identity, identity sets by membership.
impl PartialEq for SlotValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Factories(left), Self::Factories(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right)
                        .all(|((lid, lf), (rid, rf))| lid == rid && lf.same_as(rf))
            }
            (Self::Instances(left), Self::Instances(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right)
                        .all(|((lid, li), (rid, ri))| lid == rid && same_instance(li, ri))
            }
            (Self::Identities(left), Self::Identities(right)) => {
                left.members() == right.members()
            }
            (Self::Object(left), Self::Object(right)) => same_instance(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factories(factories) => f.debug_tuple("Factories").field(factories).finish(),
            Self::Instances(instances) => f
                .debug_tuple("Instances")
                .field(&instances.keys().collect::<Vec<_>>())
                .finish(),
            Self::Identities(set) => f.debug_tuple("Identities").field(set).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Named slots of a registry.
pub type SlotTable = BTreeMap<String, SlotValue>;

/// Privileged read/write access to a registry's slot table.
pub trait SlotAccess {
    /// Current slots. Identity sets are exported by handle.
    fn export_slots(&self) -> SlotTable;

    /// Replaces the named slots with `slots`. Slots absent from the table
    /// are left untouched.
    fn import_slots(&self, slots: SlotTable);

    /// Builds a fresh value for an environment slot that snapshots never
    /// carry, or `None` if the registry has no such slot.
    fn fresh_slot(&self, _name: &str) -> Option<SlotValue> {
        None
    }
}
