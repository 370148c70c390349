//! Run execution: command runner, step executor and engine

pub mod engine;
pub mod executor;
pub mod runner;

pub use engine::{ExecutionEngine, ExecutionEvent, RunFailure};
pub use executor::{StepExecutor, StepResult};
pub use runner::{CommandOutcome, CommandRunner, CommandSpec, OutputCallback, OutputStream, RunnerError, ShellRunner};
