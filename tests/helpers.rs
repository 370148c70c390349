//! Test utility functions for rust-ci

use rust_ci::core::config::WorkflowConfig;
use rust_ci::core::{Event, ExecutionStatus, Run, StepState, Workflow};
use rust_ci::execution::{
    CommandOutcome, CommandRunner, CommandSpec, ExecutionEngine, ExecutionEvent, OutputCallback,
    OutputStream, RunFailure, RunnerError,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A command the mock runner was asked to run
#[derive(Debug, Clone)]
pub struct Invocation {
    pub spec: CommandSpec,
}

/// Mock runner that returns scripted exit codes and records invocations
pub struct MockRunner {
    exit_codes: HashMap<String, Option<i32>>,
    unstartable: Vec<String>,
    hanging: Vec<String>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockRunner {
    /// Every command exits zero unless scripted otherwise
    pub fn new() -> Self {
        Self {
            exit_codes: HashMap::new(),
            unstartable: Vec::new(),
            hanging: Vec::new(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn exit_with(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), Some(code));
        self
    }

    pub fn killed(mut self, command: &str) -> Self {
        self.exit_codes.insert(command.to_string(), None);
        self
    }

    pub fn cannot_start(mut self, command: &str) -> Self {
        self.unstartable.push(command.to_string());
        self
    }

    /// The command never finishes on its own
    pub fn hangs(mut self, command: &str) -> Self {
        self.hanging.push(command.to_string());
        self
    }

    /// Shared view of the recorded invocations
    pub fn invocations(&self) -> Arc<Mutex<Vec<Invocation>>> {
        self.invocations.clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        output: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutcome, RunnerError> {
        self.invocations.lock().unwrap().push(Invocation { spec: spec.clone() });

        if self.unstartable.contains(&spec.command) {
            return Err(RunnerError::Spawn {
                command: spec.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "command not found"),
            });
        }

        if self.hanging.contains(&spec.command) {
            return std::future::pending().await;
        }

        let line = format!("mock: {}", spec.command);
        if let Some(cb) = output {
            cb.on_line(OutputStream::Stdout, &line);
        }

        Ok(CommandOutcome {
            exit_code: self.exit_codes.get(&spec.command).copied().unwrap_or(Some(0)),
            tail: vec![line],
        })
    }
}

/// The shipped `Rust` workflow
pub fn builtin_workflow() -> Workflow {
    WorkflowConfig::builtin()
        .expect("built-in workflow parses")
        .to_workflow()
        .expect("built-in workflow converts")
}

/// Workflow from inline YAML
pub fn workflow_from_yaml(yaml: &str) -> Workflow {
    WorkflowConfig::from_yaml(yaml)
        .expect("test workflow parses")
        .to_workflow()
        .expect("test workflow converts")
}

/// Test result from dispatching an event
#[derive(Debug)]
pub struct RunTestResult {
    pub run: Run,
    pub result: Result<(), RunFailure>,
    pub events: Vec<ExecutionEvent>,
    pub invocations: Vec<Invocation>,
}

impl RunTestResult {
    pub fn is_success(&self) -> bool {
        self.run.state.status == ExecutionStatus::Completed && self.result.is_ok()
    }

    pub fn is_failed(&self) -> bool {
        self.run.state.status == ExecutionStatus::Failed && self.result.is_err()
    }

    /// Commands handed to the runner, in order
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .iter()
            .map(|i| i.spec.command.clone())
            .collect()
    }

    pub fn get_step_state(&self, name: &str) -> Option<&StepState> {
        self.run.step(name).map(|s| &s.state)
    }
}

/// Dispatch an event against a workflow and, if a run starts, execute it
pub async fn dispatch_with_mock(
    workflow: &Workflow,
    event: Event,
    runner: MockRunner,
) -> Option<RunTestResult> {
    dispatch_with_mock_until(workflow, event, runner, std::future::pending()).await
}

/// Like `dispatch_with_mock`, but the run is cancelled once `shutdown` resolves
pub async fn dispatch_with_mock_until(
    workflow: &Workflow,
    event: Event,
    runner: MockRunner,
    shutdown: impl std::future::Future<Output = ()>,
) -> Option<RunTestResult> {
    let mut run = workflow.dispatch(event, std::env::temp_dir())?;

    let invocations = runner.invocations();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut engine = ExecutionEngine::new(runner);
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let result = engine.execute_until(&mut run, shutdown).await;

    let events = events.lock().unwrap().clone();
    let invocations = invocations.lock().unwrap().clone();
    Some(RunTestResult {
        run,
        result,
        events,
        invocations,
    })
}

/// Assert the run succeeded
pub fn assert_run_succeeded(result: &RunTestResult) {
    assert!(
        result.is_success(),
        "Run should have succeeded, got {:?} / {:?}",
        result.run.state.status,
        result.result
    );
}

/// Assert the run failed at the named step
pub fn assert_run_failed_at(result: &RunTestResult, step: &str) {
    assert!(
        result.is_failed(),
        "Run should have failed, got {:?}",
        result.run.state.status
    );
    assert_eq!(result.run.state.failed_step.as_deref(), Some(step));
    match &result.result {
        Err(RunFailure::StepFailed { step: failed, .. }) => assert_eq!(failed, step),
        other => panic!("Expected StepFailed for {}, got {:?}", step, other),
    }
}

/// Assert exactly these steps were executed, in this order
pub fn assert_execution_order(result: &RunTestResult, expected: &[&str]) {
    assert_eq!(result.run.executed_steps(), expected);
}

/// Assert a step was never invoked
pub fn assert_step_skipped(result: &RunTestResult, name: &str) {
    match result.get_step_state(name) {
        Some(StepState::Skipped { .. }) => {}
        other => panic!("Step {} should be skipped, got {:?}", name, other),
    }
}
