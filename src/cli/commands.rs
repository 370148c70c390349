//! CLI command definitions

use crate::core::EventKind;
use clap::Args;
use std::path::PathBuf;

/// Simulate an event and run the workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Event kind
    #[arg(short, long, value_enum)]
    pub event: EventArg,

    /// Pushed branch, or the target branch of a pull request
    #[arg(short, long)]
    pub branch: String,

    /// Commit to check out before building
    #[arg(long, value_parser = parse_sha)]
    pub sha: Option<String>,

    /// Path to workflow YAML file (defaults to the built-in workflow)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Working tree to run the steps in
    #[arg(short = 'C', long, default_value = ".")]
    pub workdir: PathBuf,

    /// Extra workflow environment (KEY=VALUE)
    #[arg(long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Hide step output; show a spinner per step instead
    #[arg(short, long)]
    pub quiet: bool,
}

/// Validate a workflow file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file (defaults to the built-in workflow)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List workflows in history
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub details: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single run
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Event kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    #[value(name = "pull-request", alias = "pull_request")]
    PullRequest,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => EventKind::Push,
            EventArg::PullRequest => EventKind::PullRequest,
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}

/// Accept only hex commit ids
pub fn parse_sha(s: &str) -> Result<String, String> {
    let valid = (4..=64).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(s.to_string())
    } else {
        Err(format!("Invalid commit SHA: {}", s))
    }
}
