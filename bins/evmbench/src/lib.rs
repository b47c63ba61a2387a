//! Execution latency benchmarks for revm.
//!
//! `evmbench contract` runs the built-in sample contract, `evmbench fixture`
//! runs transactions taken from state test fixtures.

pub mod cmd;
pub mod runner;
