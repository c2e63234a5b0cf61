//! Behavioural tests for loading [`HarnessConfig`] from the environment.

use std::cell::RefCell;
use std::ffi::OsString;

use hostbench_config::{HarnessConfig, LogFormat};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

struct Harness {
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<HarnessConfig>>,
    error: RefCell<Option<String>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
        }
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` in edition 2024; `Drop` restores
        // every override.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn config(&self) -> HarnessConfig {
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        match self.loaded.borrow().as_ref() {
            Some(config) => config.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            match value {
                Some(previous) => unsafe { std::env::set_var(&key, previous) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("the environment sets \"{key}\" to \"{value}\"")]
fn given_environment(harness: &Harness, key: String, value: String) {
    harness.set_env(&key, &value);
}

#[when("the configuration loads")]
fn when_loads(harness: &Harness) {
    match HarnessConfig::from_environment() {
        Ok(config) => *harness.loaded.borrow_mut() = Some(config),
        Err(error) => *harness.error.borrow_mut() = Some(error.to_string()),
    }
}

#[then("the database name is \"{name}\"")]
fn then_database_name(harness: &Harness, name: String) {
    assert_eq!(harness.config().database_name, name);
}

#[then("the connector database is \"{name}\"")]
fn then_connector_name(harness: &Harness, name: String) {
    let config = harness.config();
    assert_eq!(
        format!("{}{}", config.database_name, config.connector_suffix),
        name
    );
}

#[then("the log format is \"{format}\"")]
fn then_log_format(harness: &Harness, format: String) {
    let expected: LogFormat = match format.parse() {
        Ok(parsed) => parsed,
        Err(error) => panic!("invalid log format '{format}': {error}"),
    };
    assert_eq!(harness.config().log_format, expected);
}

#[scenario(
    path = "tests/features/configuration_layers.feature",
    name = "The environment overrides the database name"
)]
fn environment_overrides_database_name(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_layers.feature",
    name = "The environment selects JSON logs"
)]
fn environment_selects_json_logs(#[from(harness)] harness: Harness) {
    drop(harness);
}
