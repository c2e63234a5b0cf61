//! Output format of the harness diagnostics.
//!
//! Harness events go to stderr alongside the test runner's own output, so
//! local runs default to one compact line per event. CI jobs that collect
//! logs set `HOSTBENCH_LOG_FORMAT=json` instead.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How harness telemetry renders events.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for CI log collectors.
    Json,
    /// Single human-readable line per event, interleaved with test output.
    #[default]
    Compact,
}

impl LogFormat {
    /// Whether events are machine-readable records that must not carry
    /// terminal colour codes.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when `HOSTBENCH_LOG_FORMAT` names no known format.
pub type LogFormatParseError = strum::ParseError;
