//! Scenario-based tests for rust-ci

mod cancellation;
mod environment;
mod history;
mod success_chain;
mod trigger_matching;
