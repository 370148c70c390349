//! A single run of a workflow

use crate::core::{
    context::RunContext,
    state::{RunState, StepState},
    step::Step,
};
use chrono::Utc;

/// One ephemeral execution of a workflow's steps
#[derive(Debug, Clone)]
pub struct Run {
    pub workflow_name: String,

    /// Environment fixed for the whole run
    pub context: RunContext,

    /// Steps in execution order
    pub steps: Vec<Step>,

    pub state: RunState,
}

impl Run {
    pub fn new(workflow_name: String, context: RunContext, steps: Vec<Step>) -> Self {
        let state = RunState::new(steps.len());
        Self {
            workflow_name,
            context,
            steps,
            state,
        }
    }

    /// Get a step by display name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Names of the steps whose command was started, in order
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.state.was_executed())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Index of the first step still pending
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| matches!(s.state, StepState::Pending))
    }

    /// Stop the run from outside: the step in flight fails, the rest are skipped
    pub fn cancel(&mut self) {
        let now = Utc::now();
        for step in self.steps.iter_mut() {
            if let StepState::Running { started_at } = step.state {
                step.state = StepState::Failed {
                    error: "cancelled".to_string(),
                    exit_code: None,
                    started_at,
                    failed_at: now,
                };
            }
        }
        self.skip_remaining("run was cancelled");
        self.state.cancel();
    }

    /// Mark every step not yet reached as skipped
    pub fn skip_remaining(&mut self, reason: &str) {
        for step in self.steps.iter_mut() {
            if matches!(step.state, StepState::Pending) {
                step.state = StepState::Skipped {
                    reason: reason.to_string(),
                };
            }
        }
    }
}
