//! Unit and behavioural tests for the mock provider.

mod support;
