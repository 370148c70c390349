//! Workflow configuration from YAML

use crate::core::{step::StepAction, trigger::BranchPattern, Workflow};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// The workflow shipped with this crate
const BUILTIN_WORKFLOW: &str = include_str!("../../workflows/rust.yml");

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Events that start a run
    #[serde(rename = "on")]
    pub triggers: TriggersConfig,

    /// Environment shared by every step of a run
    #[serde(default)]
    env: BTreeMap<String, Value>,

    /// Steps, executed in declaration order
    pub steps: Vec<StepConfig>,

    /// Timeout for steps without their own (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// The `on:` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggersConfig {
    #[serde(default, deserialize_with = "present_filter", skip_serializing_if = "Option::is_none")]
    pub push: Option<EventFilterConfig>,

    #[serde(default, deserialize_with = "present_filter", skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<EventFilterConfig>,
}

/// Branch filter for one event kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventFilterConfig {
    /// Branch names or globs. Absent means every branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
}

/// A bare `push:` key enables the event with no filter
fn present_filter<'de, D>(deserializer: D) -> Result<Option<EventFilterConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let filter = Option::<EventFilterConfig>::deserialize(deserializer)?;
    Ok(Some(filter.unwrap_or_default()))
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Action reference, e.g. `actions/checkout@v2`
    #[serde(default)]
    pub uses: Option<String>,

    /// Shell command
    #[serde(default)]
    pub run: Option<String>,

    /// Step-only environment, merged over the workflow env
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, Value>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StepConfig {
    /// Step environment as strings
    pub fn env_map(&self) -> BTreeMap<String, String> {
        stringify_env(&self.env)
    }

    /// Resolve `uses`/`run` into an action
    pub fn action(&self) -> Result<StepAction> {
        match (&self.uses, &self.run) {
            (Some(_), Some(_)) => {
                anyhow::bail!("Step '{}' sets both 'uses' and 'run'", self.label())
            }
            (None, None) => {
                anyhow::bail!("Step '{}' needs either 'uses' or 'run'", self.label())
            }
            (Some(uses), None) => StepAction::from_uses(uses).with_context(|| {
                format!("Step '{}' uses unsupported action '{}'", self.label(), uses)
            }),
            (None, Some(run)) => {
                if run.trim().is_empty() {
                    anyhow::bail!("Step '{}' has an empty 'run' command", self.label());
                }
                Ok(StepAction::Run {
                    command: run.clone(),
                })
            }
        }
    }

    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.uses.as_deref())
            .or(self.run.as_deref())
            .unwrap_or("<unnamed>")
    }
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in `Rust` workflow: build and test on master/dev
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_WORKFLOW).context("Built-in workflow is invalid")
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.triggers.push.is_none() && self.triggers.pull_request.is_none() {
            anyhow::bail!("Workflow '{}' has no triggers", self.name);
        }

        for (event, filter) in self.filters() {
            for branch in filter.branches.iter().flatten() {
                if branch.trim().is_empty() {
                    anyhow::bail!("Trigger '{}' has an empty branch pattern", event);
                }
                BranchPattern::parse(branch).with_context(|| {
                    format!("Trigger '{}' has an invalid branch pattern '{}'", event, branch)
                })?;
            }
        }

        validate_env("workflow", &self.env)?;

        for step in &self.steps {
            step.action()?;
            validate_env(step.label(), &step.env)?;
        }

        Ok(())
    }

    fn filters(&self) -> impl Iterator<Item = (&'static str, &EventFilterConfig)> {
        [
            ("push", self.triggers.push.as_ref()),
            ("pull_request", self.triggers.pull_request.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, filter)| filter.map(|f| (name, f)))
    }

    /// Workflow environment as strings
    pub fn env_map(&self) -> BTreeMap<String, String> {
        stringify_env(&self.env)
    }

    /// Convert config to a Workflow domain model
    pub fn to_workflow(&self) -> Result<Workflow> {
        Workflow::from_config(self)
    }
}

fn validate_env(owner: &str, env: &BTreeMap<String, Value>) -> Result<()> {
    for (key, value) in env {
        if key.is_empty() || key.contains('=') {
            anyhow::bail!("Invalid environment variable name '{}' in {}", key, owner);
        }
        if scalar_to_string(value).is_none() {
            anyhow::bail!(
                "Environment variable '{}' in {} must be a string, number or boolean",
                key,
                owner
            );
        }
    }
    Ok(())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn stringify_env(env: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    env.iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
        .collect()
}
