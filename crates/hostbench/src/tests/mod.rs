//! Unit and behavioural tests for the harness facade.

mod behaviour;
mod support;
mod telemetry;
