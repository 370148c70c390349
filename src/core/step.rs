//! Step domain model

use crate::core::{config::StepConfig, state::StepState};
use anyhow::Result;
use std::collections::BTreeMap;

/// The only action a workflow may `use`
pub const CHECKOUT_ACTION: &str = "actions/checkout";

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Bring the working tree to the triggering commit
    Checkout { version: String },
    /// Run a shell command
    Run { command: String },
}

impl StepAction {
    /// Parse a `uses:` reference such as `actions/checkout@v2`
    pub fn from_uses(uses: &str) -> Option<Self> {
        let (action, version) = uses.trim().split_once('@')?;
        if action != CHECKOUT_ACTION || version.is_empty() {
            return None;
        }
        Some(StepAction::Checkout {
            version: version.to_string(),
        })
    }

    /// Name shown when the step has none of its own
    pub fn default_name(&self) -> String {
        match self {
            StepAction::Checkout { version } => format!("Run {}@{}", CHECKOUT_ACTION, version),
            StepAction::Run { command } => {
                let first_line = command.lines().next().unwrap_or_default();
                format!("Run {}", first_line.trim())
            }
        }
    }
}

/// A single step in a run
#[derive(Debug, Clone)]
pub struct Step {
    /// Position in the workflow (0-based)
    pub index: usize,

    /// Display name
    pub name: String,

    pub action: StepAction,

    /// Step-only environment (merged over the run env)
    pub env: BTreeMap<String, String>,

    /// Timeout in seconds, if any
    pub timeout_secs: Option<u64>,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(index: usize, config: &StepConfig, default_timeout: Option<u64>) -> Result<Self> {
        let action = config.action()?;
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| action.default_name());

        Ok(Step {
            index,
            name,
            action,
            env: config.env_map(),
            timeout_secs: config.timeout_secs.or(default_timeout),
            state: StepState::Pending,
        })
    }

    /// The command line shown to the operator
    pub fn describe(&self) -> String {
        match &self.action {
            StepAction::Checkout { version } => format!("{}@{}", CHECKOUT_ACTION, version),
            StepAction::Run { command } => command.clone(),
        }
    }
}
