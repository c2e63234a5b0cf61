//! Telemetry initialisation tests.

use rstest::rstest;

use crate::{HarnessConfig, LogFormat};
use crate::telemetry::{self, TelemetryError, parse_filter};

#[rstest]
#[case("info")]
#[case("hostbench_db=debug,hostbench_registry=trace")]
fn valid_filters_parse(#[case] expression: &str) {
    assert!(parse_filter(expression).is_ok());
}

#[test]
fn invalid_filter_is_reported() {
    let error = parse_filter("hostbench=loudly").expect_err("filter rejected");
    assert!(matches!(error, TelemetryError::Filter(_)));
    assert!(error.to_string().starts_with("invalid log filter"));
}

#[test]
fn later_calls_keep_the_first_installation() {
    let first = telemetry::initialise(&HarnessConfig::default()).expect("telemetry installs");
    let json = HarnessConfig {
        log_format: LogFormat::Json,
        ..HarnessConfig::default()
    };
    let again = telemetry::initialise(&json).expect("repeat call succeeds");
    assert_eq!(again, first);
    assert_eq!(again.format(), first.format());
}

#[test]
fn bad_filter_after_installation_is_ignored() {
    telemetry::initialise(&HarnessConfig::default()).expect("telemetry installs");
    let broken = HarnessConfig {
        log_filter: String::from("hostbench=loudly"),
        ..HarnessConfig::default()
    };
    assert!(telemetry::initialise(&broken).is_ok());
}
