//! Step executor - runs individual steps with the command runner

use crate::{
    core::{RunContext, Step, StepAction},
    execution::runner::{CommandRunner, CommandSpec, OutputCallback},
};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

/// Result of executing a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Command exited zero
    Success,
    /// Command failed to start, exited non-zero or timed out
    Failed {
        error: String,
        exit_code: Option<i32>,
        /// Last lines of output, for the failure report
        output: Vec<String>,
    },
}

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Turn a step into the command that implements it.
    ///
    /// Checkout without a commit keeps the working tree as-is. With a commit,
    /// git refuses to overwrite local changes and the step fails.
    pub fn command_for(step: &Step, context: &RunContext) -> Option<CommandSpec> {
        let command = match &step.action {
            StepAction::Run { command } => command.clone(),
            StepAction::Checkout { .. } => {
                let sha = context.event.sha.as_ref()?;
                format!(
                    "git -c advice.detachedHead=false checkout --quiet {}",
                    sha
                )
            }
        };

        Some(CommandSpec {
            command,
            workdir: context.workdir.clone(),
            env: context.env_for_step(step),
        })
    }

    /// Execute a step and return the result
    pub async fn execute(
        &self,
        step: &Step,
        context: &RunContext,
        output: Option<&dyn OutputCallback>,
    ) -> StepResult {
        info!("Executing step: {}", step.name);

        let Some(spec) = Self::command_for(step, context) else {
            if context.workdir.is_dir() {
                info!(
                    "Step {} uses working tree {} as-is",
                    step.name,
                    context.workdir.display()
                );
                return StepResult::Success;
            }
            error!("Working directory {} does not exist", context.workdir.display());
            return StepResult::Failed {
                error: format!("working directory {} does not exist", context.workdir.display()),
                exit_code: None,
                output: Vec::new(),
            };
        };

        debug!("Step {} command: {}", step.name, spec.command);
        debug!("Step {} env: {:?}", step.name, spec.env);

        let outcome = match step.timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), self.runner.run(&spec, output)).await {
                Ok(result) => result,
                Err(_) => {
                    error!("Timeout for step {} after {}s", step.name, secs);
                    return StepResult::Failed {
                        error: format!("timed out after {} seconds", secs),
                        exit_code: None,
                        output: Vec::new(),
                    };
                }
            },
            None => self.runner.run(&spec, output).await,
        };

        match outcome {
            Ok(outcome) if outcome.success() => {
                info!("Step {} completed successfully", step.name);
                StepResult::Success
            }
            Ok(outcome) => {
                let error = match outcome.exit_code {
                    Some(code) => format!("process exited with code {}", code),
                    None => "process was terminated by a signal".to_string(),
                };
                error!("Step {} failed: {}", step.name, error);
                StepResult::Failed {
                    error,
                    exit_code: outcome.exit_code,
                    output: outcome.tail,
                }
            }
            Err(e) => {
                error!("Step {} could not run: {}", step.name, e);
                StepResult::Failed {
                    error: e.to_string(),
                    exit_code: None,
                    output: Vec::new(),
                }
            }
        }
    }
}
