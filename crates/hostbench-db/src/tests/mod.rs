//! Test suites for the database lifecycle manager.

mod support;
