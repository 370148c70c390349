//! Test: Cancellation - an interrupted run stops where it is

use crate::helpers::*;
use rust_ci::core::{Event, ExecutionStatus, StepState};
use rust_ci::{ExecutionEvent, RunFailure};
use std::time::Duration;

/// Interrupting a hanging build cancels the run and never reaches the tests
#[tokio::test]
async fn test_interrupt_during_build_cancels_run() {
    let workflow = builtin_workflow();
    let runner = MockRunner::new().hangs("cargo build --verbose");

    let result = dispatch_with_mock_until(
        &workflow,
        Event::push("dev"),
        runner,
        tokio::time::sleep(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert_eq!(result.run.state.status, ExecutionStatus::Cancelled);
    assert_eq!(
        result.result,
        Err(RunFailure::Cancelled(result.run.state.run_id))
    );
    assert_execution_order(&result, &["Run actions/checkout@v2", "Build"]);
    assert_eq!(result.commands(), vec!["cargo build --verbose"]);

    match result.get_step_state("Build") {
        Some(StepState::Failed { error, .. }) => assert_eq!(error, "cancelled"),
        other => panic!("Build should have been cancelled, got {:?}", other),
    }
    assert_step_skipped(&result, "Run tests");
}

/// Cancellation is reported to event handlers
#[tokio::test]
async fn test_interrupt_emits_cancelled_completion() {
    let workflow = builtin_workflow();
    let runner = MockRunner::new().hangs("cargo test --verbose");

    let result = dispatch_with_mock_until(
        &workflow,
        Event::pull_request("master"),
        runner,
        tokio::time::sleep(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert!(!result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::StepSkipped { .. })));
    assert!(matches!(
        result.events.last(),
        Some(ExecutionEvent::RunCompleted {
            status: ExecutionStatus::Cancelled,
            ..
        })
    ));
    assert_eq!(result.run.state.completed_steps, 2);
}

/// A run that finishes before the interrupt is unaffected by it
#[tokio::test]
async fn test_run_finishing_first_is_not_cancelled() {
    let workflow = builtin_workflow();

    let result = dispatch_with_mock_until(
        &workflow,
        Event::push("master"),
        MockRunner::new(),
        tokio::time::sleep(Duration::from_secs(30)),
    )
    .await
    .unwrap();

    assert_run_succeeded(&result);
}
