//! Test suites for the registry engine.

mod behaviour;
mod context;
mod snapshot;
mod support;
