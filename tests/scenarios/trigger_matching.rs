//! Test: Trigger Matching - which events start a run

use crate::helpers::*;
use rust_ci::core::Event;

/// Pushes to branches outside the filter never create a run
#[tokio::test]
async fn test_push_to_feature_branch_creates_no_run() {
    let workflow = builtin_workflow();
    let runner = MockRunner::new();
    let invocations = runner.invocations();

    let result = dispatch_with_mock(&workflow, Event::push("feature/x"), runner).await;

    assert!(result.is_none(), "No run should be created for feature/x");
    assert!(invocations.lock().unwrap().is_empty());
}

/// Both event kinds on both filtered branches start exactly one run
#[tokio::test]
async fn test_filtered_branches_start_one_run() {
    let workflow = builtin_workflow();

    for event in [
        Event::push("master"),
        Event::push("dev"),
        Event::pull_request("master"),
        Event::pull_request("dev"),
    ] {
        let result = dispatch_with_mock(&workflow, event.clone(), MockRunner::new())
            .await
            .unwrap_or_else(|| panic!("{:?} should start a run", event));

        let started = result
            .events
            .iter()
            .filter(|e| matches!(e, rust_ci::ExecutionEvent::RunStarted { .. }))
            .count();
        assert_eq!(started, 1);
        assert_run_succeeded(&result);
    }
}

/// Branch names must match exactly, not by prefix or case
#[tokio::test]
async fn test_near_miss_branches_are_ignored() {
    let workflow = builtin_workflow();

    for branch in ["mast", "master2", "Dev", "dev/x", "refs/tags/dev"] {
        assert!(
            dispatch_with_mock(&workflow, Event::push(branch), MockRunner::new())
                .await
                .is_none(),
            "{} should not trigger",
            branch
        );
    }
}

/// A full ref name resolves to its branch
#[tokio::test]
async fn test_full_ref_name_triggers() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::push("refs/heads/master"), MockRunner::new()).await;
    assert!(result.is_some());
}

/// Workflows may restrict one event kind and leave the other out entirely
#[tokio::test]
async fn test_event_kind_without_trigger() {
    let yaml = r#"
name: "PR only"
on:
  pull_request:
    branches: [ "release/*" ]
steps:
  - name: "Check"
    run: "cargo check"
"#;
    let workflow = workflow_from_yaml(yaml);

    assert!(dispatch_with_mock(&workflow, Event::push("release/1.0"), MockRunner::new())
        .await
        .is_none());

    let result = dispatch_with_mock(&workflow, Event::pull_request("release/1.0"), MockRunner::new())
        .await
        .expect("glob should match");
    assert_run_succeeded(&result);
    assert_eq!(result.commands(), vec!["cargo check"]);
}
