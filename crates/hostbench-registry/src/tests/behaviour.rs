//! Behavioural tests for registry isolation.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{FakeSession, Host, RealSession, SESSION};
use crate::context::HarnessContext;
use crate::factory::ServiceInstance;
use crate::registry::{ServiceRegistry, TIMEZONE_SLOT, URL_GENERATOR_SLOT};
use crate::slots::{SlotAccess, SlotTable};
use crate::snapshot::RegistrySnapshot;

type StepResult = Result<(), String>;

#[derive(Default)]
struct RegistryWorld {
    host: Option<Host>,
    context: Option<HarnessContext>,
    first_session: Option<ServiceInstance>,
    slots_before: Option<SlotTable>,
    timezone_before: Option<ServiceInstance>,
}

impl RegistryWorld {
    fn host(&self) -> Result<&Host, String> {
        self.host.as_ref().ok_or_else(|| String::from("host not set up"))
    }

    fn context(&self) -> Result<&HarnessContext, String> {
        self.context
            .as_ref()
            .ok_or_else(|| String::from("harness context not set up"))
    }
}

#[fixture]
fn world() -> RefCell<RegistryWorld> {
    RefCell::new(RegistryWorld::default())
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches('"')
}

fn environment_free(mut slots: SlotTable) -> SlotTable {
    slots.remove(TIMEZONE_SLOT);
    slots.remove(URL_GENERATOR_SLOT);
    slots
}

#[given("a host with a real session service")]
fn given_host(world: &RefCell<RegistryWorld>) {
    world.borrow_mut().host = Some(Host::new());
}

#[given("a harness context for module {module}")]
fn given_context(world: &RefCell<RegistryWorld>, module: String) -> StepResult {
    let mut world = world.borrow_mut();
    let context = HarnessContext::new(strip_quotes(&module));
    context.begin_case(&world.host()?.registries);
    world.context = Some(context);
    Ok(())
}

#[given("the session has been resolved once")]
fn given_resolved(world: &RefCell<RegistryWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let session = world
        .host()?
        .global
        .resolve(&SESSION)
        .map_err(|error| error.to_string())?;
    world.first_session = Some(session);
    Ok(())
}

#[when("a test case installs a session double")]
fn when_double_installed(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    world
        .context()?
        .overrides()
        .register_class_instance(
            &world.host()?.registries,
            &SESSION,
            Some(Arc::new(FakeSession)),
            true,
        )
        .map_err(|error| error.to_string())
}

#[when("the session double is cleared")]
fn when_double_cleared(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    world
        .context()?
        .overrides()
        .register_class_instance(&world.host()?.registries, &SESSION, None, true)
        .map_err(|error| error.to_string())
}

#[when("the next test case begins")]
fn when_next_case(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    world.context()?.begin_case(&world.host()?.registries);
    Ok(())
}

#[when("the global registry is snapshotted and restored")]
fn when_round_trip(world: &RefCell<RegistryWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let global = Arc::clone(&world.host()?.global);
    world.slots_before = Some(environment_free(global.export_slots()));
    world.timezone_before = Some(global.timezone());
    let snapshot = RegistrySnapshot::capture(global.as_ref());
    snapshot.restore_into(global.as_ref());
    Ok(())
}

#[then("the session resolves to the real implementation")]
fn then_real(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    let session = world
        .host()?
        .global
        .resolve(&SESSION)
        .map_err(|error| error.to_string())?;
    if session.downcast::<RealSession>().is_err() {
        return Err(String::from("session is not the real implementation"));
    }
    Ok(())
}

#[then("the session resolves to the double")]
fn then_double(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    let session = world
        .host()?
        .app
        .resolve(&SESSION)
        .map_err(|error| error.to_string())?;
    if session.downcast::<FakeSession>().is_err() {
        return Err(String::from("session is not the double"));
    }
    Ok(())
}

#[then("the session resolves to the first real instance")]
fn then_first_instance(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    let first = world
        .first_session
        .as_ref()
        .ok_or_else(|| String::from("session was never resolved"))?;
    let session = world
        .host()?
        .global
        .resolve(&SESSION)
        .map_err(|error| error.to_string())?;
    if !Arc::ptr_eq(first, &session) {
        return Err(String::from("a different session instance was served"));
    }
    Ok(())
}

#[then("the real session factory ran once")]
fn then_built_once(world: &RefCell<RegistryWorld>) -> StepResult {
    let builds = world.borrow().host()?.session_builds();
    if builds != 1 {
        return Err(format!("real factory ran {builds} times"));
    }
    Ok(())
}

#[then("every non-environment slot is unchanged")]
fn then_slots_unchanged(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    let before = world
        .slots_before
        .as_ref()
        .ok_or_else(|| String::from("no slots recorded"))?;
    let after = environment_free(world.host()?.global.export_slots());
    if &after != before {
        return Err(format!("slots changed: {before:?} -> {after:?}"));
    }
    Ok(())
}

#[then("the timezone provider was recreated")]
fn then_timezone_recreated(world: &RefCell<RegistryWorld>) -> StepResult {
    let world = world.borrow();
    let before = world
        .timezone_before
        .as_ref()
        .ok_or_else(|| String::from("no timezone recorded"))?;
    if Arc::ptr_eq(before, &world.host()?.global.timezone()) {
        return Err(String::from("timezone provider survived the restore"));
    }
    Ok(())
}

#[scenario(
    path = "tests/features/registry_isolation.feature",
    name = "Overrides do not leak into the next test case"
)]
fn overrides_do_not_leak(world: RefCell<RegistryWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/registry_isolation.feature",
    name = "A cleared double falls back to the original instance"
)]
fn cleared_double_falls_back(world: RefCell<RegistryWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/registry_isolation.feature",
    name = "Snapshot round trip preserves every non-environment slot"
)]
fn snapshot_round_trip(world: RefCell<RegistryWorld>) {
    drop(world);
}
