//! rust-ci - run a CI workflow locally for push and pull-request events

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::config::WorkflowConfig;
pub use crate::core::{Event, EventKind, ExecutionStatus, Run, Step, StepState, Workflow};
pub use execution::{CommandRunner, ExecutionEngine, ExecutionEvent, RunFailure, ShellRunner};
