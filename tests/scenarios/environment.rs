//! Test: Environment - the run env is fixed and shared by every step

use crate::helpers::*;
use rust_ci::core::Event;

/// Build and test both see CARGO_TERM_COLOR=always
#[tokio::test]
async fn test_color_flag_reaches_build_and_test() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::push("dev"), MockRunner::new())
        .await
        .unwrap();

    assert_eq!(result.invocations.len(), 2);
    for invocation in &result.invocations {
        assert_eq!(
            invocation.spec.env.get("CARGO_TERM_COLOR").map(String::as_str),
            Some("always"),
            "{} should see the color flag",
            invocation.spec.command
        );
    }
    assert_eq!(result.invocations[0].spec.env, result.invocations[1].spec.env);
}

/// Steps run in the run's working directory
#[tokio::test]
async fn test_steps_share_workdir() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::push("master"), MockRunner::new())
        .await
        .unwrap();

    for invocation in &result.invocations {
        assert_eq!(invocation.spec.workdir, std::env::temp_dir());
    }
}

/// Overrides applied before dispatch are seen identically by every step
#[tokio::test]
async fn test_override_before_dispatch() {
    let mut workflow = builtin_workflow();
    workflow
        .env
        .insert("CARGO_TERM_COLOR".to_string(), "never".to_string());

    let result = dispatch_with_mock(&workflow, Event::pull_request("dev"), MockRunner::new())
        .await
        .unwrap();

    for invocation in &result.invocations {
        assert_eq!(
            invocation.spec.env.get("CARGO_TERM_COLOR").map(String::as_str),
            Some("never")
        );
    }
}

/// Event details are exported to the steps
#[tokio::test]
async fn test_event_variables_are_exported() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::pull_request("master"), MockRunner::new())
        .await
        .unwrap();

    let env = &result.invocations[0].spec.env;
    assert_eq!(env.get("CI").map(String::as_str), Some("true"));
    assert_eq!(env.get("CI_EVENT_NAME").map(String::as_str), Some("pull_request"));
    assert_eq!(env.get("CI_REF_NAME").map(String::as_str), Some("master"));
    assert!(env.get("CI_SHA").is_none());
}
