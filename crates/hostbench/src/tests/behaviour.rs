//! Behavioural tests for the harness session.

use std::cell::RefCell;
use std::sync::Arc;

use hostbench_db::test_support::{FixedToolLocator, SCRIPTED_SERVER_PID, ScriptedRunner};
use hostbench_registry::{InMemoryRegistry, resolve_as};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use super::support::{Fixture, RealSession};
use crate::catalogue::SESSION;
use crate::{FakeSession, HarnessSession, MockProvider};

type StepResult = Result<(), String>;

#[derive(Default)]
struct SessionWorld {
    session: Option<HarnessSession<ScriptedRunner, FixedToolLocator>>,
    runner: Option<ScriptedRunner>,
    global: Option<Arc<InMemoryRegistry>>,
    _artifacts: Option<TempDir>,
    provider: Option<MockProvider>,
}

impl SessionWorld {
    fn global(&self) -> Result<&InMemoryRegistry, String> {
        self.global
            .as_deref()
            .ok_or_else(|| String::from("no host registries"))
    }
}

#[fixture]
fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::default())
}

#[given("an open harness session")]
fn given_open_session(world: &RefCell<SessionWorld>) {
    let fixture = Fixture::open();
    let mut world = world.borrow_mut();
    world.session = Some(fixture.session);
    world.runner = Some(fixture.runner);
    world.global = Some(fixture.global);
    world._artifacts = Some(fixture.artifacts);
}

#[when("a test case builds its provider")]
fn when_provider_built(world: &RefCell<SessionWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let provider = world
        .session
        .as_ref()
        .ok_or_else(|| String::from("no session"))?
        .mock_provider()
        .map_err(|error| error.to_string())?;
    world.provider = Some(provider);
    Ok(())
}

#[when("the suite finishes")]
fn when_suite_finishes(world: &RefCell<SessionWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    world.provider = None;
    world
        .session
        .take()
        .ok_or_else(|| String::from("no session"))?
        .finish();
    Ok(())
}

#[then("the global registry serves the provider session")]
fn then_serves_double(world: &RefCell<SessionWorld>) -> StepResult {
    let world = world.borrow();
    let provider = world
        .provider
        .as_ref()
        .ok_or_else(|| String::from("no provider"))?;
    let served = resolve_as::<FakeSession, _>(world.global()?, &SESSION)
        .map_err(|error| error.to_string())?;
    if Arc::ptr_eq(&served, &provider.get_session()) {
        Ok(())
    } else {
        Err(String::from("global registry served another session"))
    }
}

#[then("the database server was killed")]
fn then_server_killed(world: &RefCell<SessionWorld>) -> StepResult {
    let world = world.borrow();
    let killed = world
        .runner
        .as_ref()
        .ok_or_else(|| String::from("no runner"))?
        .killed_pids();
    if killed == vec![SCRIPTED_SERVER_PID] {
        Ok(())
    } else {
        Err(format!("unexpected kills: {killed:?}"))
    }
}

#[then("the global registry serves the real session")]
fn then_serves_real(world: &RefCell<SessionWorld>) -> StepResult {
    let world = world.borrow();
    resolve_as::<RealSession, _>(world.global()?, &SESSION)
        .map(drop)
        .map_err(|error| error.to_string())
}

#[scenario(
    path = "tests/features/harness_session.feature",
    name = "A suite runs a case and leaves the host clean"
)]
fn suite_leaves_host_clean(world: RefCell<SessionWorld>) {
    drop(world);
}
