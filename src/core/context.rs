//! Run context - what every step of a run sees

use crate::core::{trigger::Event, Step};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fixed execution environment of one run
///
/// Created once when a trigger matches and never changed afterwards, so
/// every step observes the same working directory and workflow env.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Working tree the steps run in
    pub workdir: PathBuf,

    /// Workflow-level environment
    pub env: BTreeMap<String, String>,

    /// The event that started the run
    pub event: Event,
}

impl RunContext {
    pub fn new(workdir: PathBuf, env: BTreeMap<String, String>, event: Event) -> Self {
        Self { workdir, env, event }
    }

    /// Environment for one step: run env, then step env on top,
    /// then the `CI_*` variables describing the event.
    pub fn env_for_step(&self, step: &Step) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        env.extend(step.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        env.insert("CI".to_string(), "true".to_string());
        env.insert("CI_EVENT_NAME".to_string(), self.event.kind.as_str().to_string());
        env.insert("CI_REF_NAME".to_string(), self.event.branch.clone());
        if let Some(sha) = &self.event.sha {
            env.insert("CI_SHA".to_string(), sha.clone());
        }

        env
    }
}
