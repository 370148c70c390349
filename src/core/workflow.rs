//! Workflow domain model

use crate::core::{
    config::WorkflowConfig,
    context::RunContext,
    run::Run,
    step::Step,
    trigger::{BranchPattern, Event, EventKind, TriggerRule},
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// A workflow definition: triggers, environment and ordered steps
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,

    pub triggers: Vec<TriggerRule>,

    /// Environment shared by every step
    pub env: BTreeMap<String, String>,

    /// Steps in declaration order
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Create a workflow from configuration
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let mut triggers = Vec::new();
        for (kind, filter) in [
            (EventKind::Push, &config.triggers.push),
            (EventKind::PullRequest, &config.triggers.pull_request),
        ] {
            let Some(filter) = filter else { continue };
            let branches = match &filter.branches {
                Some(names) => Some(
                    names
                        .iter()
                        .map(|name| BranchPattern::parse(name))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                None => None,
            };
            triggers.push(TriggerRule::new(kind, branches));
        }

        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| Step::from_config(index, step, config.default_timeout_secs))
            .collect::<Result<Vec<_>>>()?;

        Ok(Workflow {
            name: config.name.clone(),
            triggers,
            env: config.env_map(),
            steps,
        })
    }

    /// Check whether an event starts a run
    pub fn matches(&self, event: &Event) -> bool {
        self.triggers.iter().any(|rule| rule.matches(event))
    }

    /// Create a run for the event, or `None` when no trigger matches
    pub fn dispatch(&self, event: Event, workdir: impl Into<PathBuf>) -> Option<Run> {
        if !self.matches(&event) {
            debug!(
                "Workflow {} ignores {} on {}",
                self.name, event.kind, event.branch
            );
            return None;
        }

        info!(
            "Workflow {} triggered by {} on {}",
            self.name, event.kind, event.branch
        );
        let context = RunContext::new(workdir.into(), self.env.clone(), event);
        Some(Run::new(self.name.clone(), context, self.steps.clone()))
    }
}
