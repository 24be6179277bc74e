//! Integration tests for nanowatch acceptance testing.
//!
//! Scenario tests replay fixed timelines; property tests check the table's
//! invariants over longer generated workloads.

mod common;
mod pacing_test;
mod property_test;
mod scenario_test;
