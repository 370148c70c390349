//! Test: Success Chain - every step runs in declaration order

use crate::helpers::*;
use rust_ci::core::{Event, ExecutionStatus, StepState};

/// Push to dev with passing build and tests succeeds with both steps recorded
#[tokio::test]
async fn test_push_to_dev_succeeds() {
    let workflow = builtin_workflow();

    let result = dispatch_with_mock(&workflow, Event::push("dev"), MockRunner::new())
        .await
        .expect("dev should trigger");

    assert_run_succeeded(&result);
    assert_execution_order(&result, &["Run actions/checkout@v2", "Build", "Run tests"]);
    assert_eq!(
        result.commands(),
        vec!["cargo build --verbose", "cargo test --verbose"]
    );
    assert_eq!(result.run.state.completed_steps, 3);
    assert!(result.run.state.completed_at.is_some());
}

/// Every step ends in the succeeded state
#[tokio::test]
async fn test_all_steps_succeeded() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::pull_request("dev"), MockRunner::new())
        .await
        .unwrap();

    for step in &result.run.steps {
        assert!(
            matches!(step.state, StepState::Succeeded { .. }),
            "{} should have succeeded, got {:?}",
            step.name,
            step.state
        );
    }
}

/// Checkout with a commit runs git before the build
#[tokio::test]
async fn test_checkout_with_sha_runs_first() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(
        &workflow,
        Event::push("master").with_sha("a1b2c3d4"),
        MockRunner::new(),
    )
    .await
    .unwrap();

    assert_run_succeeded(&result);
    let commands = result.commands();
    assert_eq!(commands.len(), 3);
    assert!(commands[0].contains("checkout --force --quiet a1b2c3d4"));
    assert_eq!(commands[1], "cargo build --verbose");
    assert_eq!(commands[2], "cargo test --verbose");
}

/// Longer workflows keep declaration order
#[tokio::test]
async fn test_many_steps_keep_order() {
    let yaml = r#"
name: "Lint and test"
on:
  push:
steps:
  - name: "fmt"
    run: "cargo fmt --check"
  - name: "clippy"
    run: "cargo clippy"
  - name: "build"
    run: "cargo build"
  - name: "test"
    run: "cargo test"
"#;
    let workflow = workflow_from_yaml(yaml);
    let result = dispatch_with_mock(&workflow, Event::push("any"), MockRunner::new())
        .await
        .unwrap();

    assert_eq!(result.run.state.status, ExecutionStatus::Completed);
    assert_execution_order(&result, &["fmt", "clippy", "build", "test"]);
}

/// A workflow without steps succeeds trivially
#[tokio::test]
async fn test_empty_workflow_succeeds() {
    let yaml = r#"
name: "Nothing"
on:
  push:
steps: []
"#;
    let workflow = workflow_from_yaml(yaml);
    let result = dispatch_with_mock(&workflow, Event::push("dev"), MockRunner::new())
        .await
        .unwrap();

    assert_run_succeeded(&result);
    assert!(result.invocations.is_empty());
}
