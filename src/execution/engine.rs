//! Main execution engine - runs a workflow's steps in order, fail-fast

use crate::{
    core::{Event, ExecutionStatus, Run, StepState},
    execution::{
        executor::{StepExecutor, StepResult},
        runner::{CommandRunner, OutputCallback},
    },
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Reason shown on steps that were never reached
pub const SKIPPED_AFTER_FAILURE: &str = "a previous step failed";

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        workflow_name: String,
        event: Event,
    },
    StepStarted {
        /// 1-based position
        number: usize,
        total: usize,
        name: String,
        command: String,
    },
    StepSucceeded {
        name: String,
        duration: Duration,
    },
    StepFailed {
        name: String,
        error: String,
        output: Vec<String>,
    },
    StepSkipped {
        name: String,
        reason: String,
    },
    RunCompleted {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Why a run did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("run {0} has already been executed")]
    AlreadyExecuted(Uuid),

    #[error("run {0} was cancelled")]
    Cancelled(Uuid),
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Sequential, fail-fast run executor
pub struct ExecutionEngine<R> {
    executor: StepExecutor<R>,
    event_handlers: Vec<EventHandler>,
    output: Option<Arc<dyn OutputCallback>>,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            event_handlers: Vec::new(),
            output: None,
        }
    }

    /// Forward step output to a callback while it is produced
    pub fn with_output(mut self, output: Arc<dyn OutputCallback>) -> Self {
        self.output = Some(output);
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute every step of the run in order.
    ///
    /// The first failing step ends the run: it is marked failed, all later
    /// steps are marked skipped without being invoked, and the run fails.
    pub async fn execute(&self, run: &mut Run) -> Result<(), RunFailure> {
        let run_id = run.state.run_id;
        if run.state.status != ExecutionStatus::Pending {
            warn!("Run {} was already executed", run_id);
            return Err(RunFailure::AlreadyExecuted(run_id));
        }

        info!("Starting run {} of workflow {}", run_id, run.workflow_name);
        self.emit_event(ExecutionEvent::RunStarted {
            run_id,
            workflow_name: run.workflow_name.clone(),
            event: run.context.event.clone(),
        });

        run.state.start();
        let total = run.steps.len();

        while let Some(index) = run.next_pending() {
            let started_at = Utc::now();
            run.steps[index].state = StepState::Running { started_at };

            let step = &run.steps[index];
            let name = step.name.clone();
            self.emit_event(ExecutionEvent::StepStarted {
                number: index + 1,
                total,
                name: name.clone(),
                command: step.describe(),
            });

            let timer = Instant::now();
            let result = self
                .executor
                .execute(step, &run.context, self.output.as_deref())
                .await;

            match result {
                StepResult::Success => {
                    run.steps[index].state = StepState::Succeeded {
                        started_at,
                        completed_at: Utc::now(),
                    };
                    run.state.completed_steps += 1;
                    self.emit_event(ExecutionEvent::StepSucceeded {
                        name,
                        duration: timer.elapsed(),
                    });
                }
                StepResult::Failed {
                    error,
                    exit_code,
                    output,
                } => {
                    run.steps[index].state = StepState::Failed {
                        error: error.clone(),
                        exit_code,
                        started_at,
                        failed_at: Utc::now(),
                    };
                    run.state.fail(&name);
                    self.emit_event(ExecutionEvent::StepFailed {
                        name: name.clone(),
                        error: error.clone(),
                        output,
                    });

                    self.skip_remaining(run);

                    error!("Run {} failed at step {}: {}", run_id, name, error);
                    self.emit_event(ExecutionEvent::RunCompleted {
                        run_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(RunFailure::StepFailed {
                        step: name,
                        reason: error,
                    });
                }
            }
        }

        run.state.complete();
        info!("Run {} of workflow {} completed", run_id, run.workflow_name);
        self.emit_event(ExecutionEvent::RunCompleted {
            run_id,
            status: ExecutionStatus::Completed,
        });

        Ok(())
    }

    /// Execute the run unless `shutdown` resolves first.
    ///
    /// On shutdown the step in flight is dropped (its child process is
    /// killed), the run is marked cancelled and later steps are skipped.
    pub async fn execute_until<F>(&self, run: &mut Run, shutdown: F) -> Result<(), RunFailure>
    where
        F: Future<Output = ()>,
    {
        let finished = tokio::select! {
            result = self.execute(run) => Some(result),
            _ = shutdown => None,
        };
        if let Some(result) = finished {
            return result;
        }

        let run_id = run.state.run_id;
        warn!("Run {} interrupted", run_id);
        run.cancel();
        self.emit_skipped(run);
        self.emit_event(ExecutionEvent::RunCompleted {
            run_id,
            status: ExecutionStatus::Cancelled,
        });
        Err(RunFailure::Cancelled(run_id))
    }

    fn skip_remaining(&self, run: &mut Run) {
        run.skip_remaining(SKIPPED_AFTER_FAILURE);
        self.emit_skipped(run);
    }

    fn emit_skipped(&self, run: &Run) {
        for step in &run.steps {
            if let StepState::Skipped { reason } = &step.state {
                self.emit_event(ExecutionEvent::StepSkipped {
                    name: step.name.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }
}
