//! Unit tests for registry snapshots.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::support::{Host, RealSession, SESSION, STORAGE};
use crate::factory::{Lifetime, ServiceFactory};
use crate::id::ServiceId;
use crate::registry::{
    FACTORIES_SLOT, InMemoryRegistry, ServiceRegistry, TIMEZONE_SLOT, TRANSIENT_SLOT,
    URL_GENERATOR_SLOT,
};
use crate::slots::{SlotAccess, SlotTable, SlotValue};
use crate::snapshot::{RegistriesSnapshot, RegistrySnapshot};

#[fixture]
fn host() -> Host {
    Host::new()
}

fn without_environment(mut slots: SlotTable) -> SlotTable {
    slots.remove(TIMEZONE_SLOT);
    slots.remove(URL_GENERATOR_SLOT);
    slots
}

fn transient_members(slots: &SlotTable) -> usize {
    match slots.get(TRANSIENT_SLOT) {
        Some(SlotValue::Identities(set)) => set.lock().len(),
        other => panic!("unexpected transient slot: {other:?}"),
    }
}

#[rstest]
fn round_trip_preserves_every_other_slot(host: Host) {
    host.global.resolve(&SESSION).expect("warm the cache");
    host.global.register(
        ServiceId::from_static("host::Clock"),
        ServiceFactory::from_fn(|| 0_u64),
        Lifetime::Transient,
    );
    let before = without_environment(host.global.export_slots());

    let snapshot = RegistrySnapshot::capture(host.global.as_ref());
    snapshot.restore_into(host.global.as_ref());

    assert_eq!(without_environment(host.global.export_slots()), before);
}

#[rstest]
fn snapshot_excludes_environment_slots(host: Host) {
    let snapshot = RegistrySnapshot::capture(host.global.as_ref());
    assert!(!snapshot.slots().contains_key(TIMEZONE_SLOT));
    assert!(!snapshot.slots().contains_key(URL_GENERATOR_SLOT));
    assert!(snapshot.slots().contains_key(FACTORIES_SLOT));
}

#[rstest]
fn restore_recreates_environment_singletons(host: Host) {
    let timezone = host.global.timezone();
    let snapshot = RegistrySnapshot::capture(host.global.as_ref());
    snapshot.restore_into(host.global.as_ref());
    assert!(!Arc::ptr_eq(&timezone, &host.global.timezone()));
}

#[rstest]
fn capture_keeps_cached_instances_valid(host: Host) {
    let cached = host.global.resolve(&SESSION).expect("resolve");
    let snapshot = RegistrySnapshot::capture(host.global.as_ref());

    let live = host.global.resolve(&SESSION).expect("resolve");
    assert!(Arc::ptr_eq(&cached, &live));
    match snapshot.slots().get(crate::registry::INSTANCES_SLOT) {
        Some(SlotValue::Instances(instances)) => {
            let captured = instances.get(&SESSION).expect("instance captured");
            assert!(Arc::ptr_eq(captured, &cached));
        }
        other => panic!("unexpected instances slot: {other:?}"),
    }
}

#[rstest]
fn later_registrations_are_rolled_back(host: Host) {
    let original = host.global.resolve(&SESSION).expect("resolve");
    let snapshot = RegistrySnapshot::capture(host.global.as_ref());

    host.global.register(
        SESSION,
        ServiceFactory::from_fn(|| RealSession(99)),
        Lifetime::Shared,
    );
    let replaced = host.global.resolve(&SESSION).expect("resolve");
    assert!(!Arc::ptr_eq(&original, &replaced));

    snapshot.restore_into(host.global.as_ref());
    let restored = host.global.resolve(&SESSION).expect("resolve");
    assert!(Arc::ptr_eq(&original, &restored));
    assert_eq!(host.session_builds(), 1);
}

#[rstest]
fn identity_sets_are_copied_not_aliased(host: Host) {
    let snapshot = RegistrySnapshot::capture(host.global.as_ref());
    host.global.register(
        ServiceId::from_static("host::Clock"),
        ServiceFactory::from_fn(|| 0_u64),
        Lifetime::Transient,
    );
    assert_eq!(transient_members(snapshot.slots()), 0);

    snapshot.restore_into(host.global.as_ref());
    assert_eq!(transient_members(&host.global.export_slots()), 0);

    host.global.register(
        ServiceId::from_static("host::Clock"),
        ServiceFactory::from_fn(|| 1_u64),
        Lifetime::Transient,
    );
    assert_eq!(transient_members(snapshot.slots()), 0);
    snapshot.restore_into(host.global.as_ref());
    assert_eq!(transient_members(&host.global.export_slots()), 0);
}

#[rstest]
fn registries_snapshot_covers_module_registries(host: Host) {
    let snapshot = RegistriesSnapshot::capture(&host.registries);
    host.files.register(
        STORAGE,
        ServiceFactory::from_fn(|| String::from("replaced")),
        Lifetime::Shared,
    );
    snapshot.restore(&host.registries);

    let storage = crate::registry::resolve_as::<String, _>(host.files.as_ref(), &STORAGE)
        .expect("storage resolves");
    assert_eq!(storage.as_str(), "local storage");
    assert!(snapshot.module("files").is_some());
    assert!(snapshot.module("calendar").is_none());
}

#[rstest]
fn unknown_module_registries_are_left_alone(host: Host) {
    let snapshot = RegistriesSnapshot::capture(&host.registries);
    let calendar = Arc::new(InMemoryRegistry::new("calendar"));
    let id = ServiceId::from_static("calendar::Events");
    calendar.register(id.clone(), ServiceFactory::from_fn(|| 3_u8), Lifetime::Shared);
    let registries = host.registries.clone().with_module("calendar", calendar.clone());

    snapshot.restore(&registries);
    assert!(calendar.factory(&id).is_some());
}
