//! Unit tests for the harness session lifecycle.

use std::sync::Arc;

use hostbench_config::HarnessConfig;
use rstest::{fixture, rstest};

use super::support::{FakeSession, Host, RealSession, SESSION};
use crate::context::{BaselineAction, ContextState, HarnessContext};
use crate::registry::{ServiceRegistry, resolve_as};

#[fixture]
fn host() -> Host {
    Host::new()
}

#[fixture]
fn context() -> HarnessContext {
    HarnessContext::from_config(&HarnessConfig::default())
}

#[rstest]
fn first_case_captures_then_later_cases_restore(host: Host, context: HarnessContext) {
    assert_eq!(context.state(), ContextState::Uninitialised);
    assert_eq!(context.begin_case(&host.registries), BaselineAction::Captured);
    assert_eq!(context.state(), ContextState::Active);
    assert_eq!(context.begin_case(&host.registries), BaselineAction::Restored);
}

#[rstest]
fn overrides_do_not_leak_into_the_next_case(host: Host, context: HarnessContext) {
    context.begin_case(&host.registries);
    let real = host.global.factory(&SESSION).expect("real factory");
    context
        .overrides()
        .register_class_instance(&host.registries, &SESSION, Some(Arc::new(FakeSession)), true)
        .expect("install double");
    assert!(resolve_as::<FakeSession, _>(host.global.as_ref(), &SESSION).is_ok());

    context.begin_case(&host.registries);
    let restored = host.global.factory(&SESSION).expect("factory after restore");
    assert!(restored.same_as(&real));
    assert!(host.app.factory(&SESSION).is_none());
    assert!(resolve_as::<RealSession, _>(host.global.as_ref(), &SESSION).is_ok());
}

#[rstest]
fn baseline_is_the_first_observed_state(host: Host, context: HarnessContext) {
    context.begin_case(&host.registries);
    let baseline = context.baseline().expect("baseline captured");

    host.global.resolve(&SESSION).expect("warm the cache");
    context.begin_case(&host.registries);
    assert_eq!(context.baseline(), Some(baseline));
    assert!(host.global.cached(&SESSION).is_none());
}

#[rstest]
fn reset_suite_forgets_baseline_and_originals(host: Host, context: HarnessContext) {
    context.begin_case(&host.registries);
    host.global.resolve(&SESSION).expect("warm the cache");
    context
        .overrides()
        .register_service(&host.registries, &SESSION)
        .expect("install override");
    assert!(context.overrides().original(&SESSION).is_some());

    context.reset_suite(&host.registries);
    assert_eq!(context.state(), ContextState::Uninitialised);
    assert!(context.overrides().original(&SESSION).is_none());
    let factory = host.global.factory(&SESSION).expect("real factory");
    assert!(!context.overrides().is_wrapper(&factory));
    assert_eq!(context.begin_case(&host.registries), BaselineAction::Captured);
}
