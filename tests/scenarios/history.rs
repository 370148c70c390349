//! Test: History - recording a run never changes its outcome

use crate::helpers::*;
use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_ci::core::{Event, ExecutionStatus};
use rust_ci::persistence::{record_run, InMemoryPersistence, PersistenceBackend, RunSummary};
use uuid::Uuid;

/// Backend whose every operation fails, like a locked or read-only database
struct BrokenStore;

#[async_trait]
impl PersistenceBackend for BrokenStore {
    async fn save_run(&self, _run: &RunSummary) -> Result<()> {
        bail!("database is locked")
    }

    async fn load_run(&self, _run_id: Uuid) -> Result<Option<RunSummary>> {
        bail!("database is locked")
    }

    async fn list_runs(&self, _workflow_name: &str) -> Result<Vec<RunSummary>> {
        bail!("database is locked")
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        bail!("database is locked")
    }
}

/// A successful run stays successful when history cannot be written
#[tokio::test]
async fn test_save_failure_keeps_success() {
    let workflow = builtin_workflow();
    let result = dispatch_with_mock(&workflow, Event::push("dev"), MockRunner::new())
        .await
        .unwrap();

    assert!(!record_run(&BrokenStore, &result.run).await);

    assert_run_succeeded(&result);
    assert_eq!(result.run.state.status, ExecutionStatus::Completed);
}

/// A saved run can be read back with its outcome
#[tokio::test]
async fn test_failed_run_is_recorded() {
    let workflow = builtin_workflow();
    let runner = MockRunner::new().exit_with("cargo build --verbose", 1);
    let result = dispatch_with_mock(&workflow, Event::pull_request("master"), runner)
        .await
        .unwrap();

    let store = InMemoryPersistence::new();
    assert!(record_run(&store, &result.run).await);

    let saved = store
        .load_run(result.run.state.run_id)
        .await
        .unwrap()
        .expect("run should be saved");
    assert_eq!(saved.status, ExecutionStatus::Failed);
    assert_eq!(saved.failed_step.as_deref(), Some("Build"));
    assert_eq!(saved.branch, "master");
    assert_eq!(saved.completed_steps, 1);
    assert_eq!(saved.total_steps, 3);
}
