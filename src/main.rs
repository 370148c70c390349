use anyhow::{Context, Result};
use rust_ci::cli::commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use rust_ci::cli::output::*;
use rust_ci::cli::terminal_output::TerminalOutputCallback;
use rust_ci::cli::{Cli, Command};
use rust_ci::core::{config::WorkflowConfig, Event, ExecutionStatus};
use rust_ci::execution::{ExecutionEngine, ExecutionEvent, ShellRunner};
use rust_ci::persistence::{record_run, InMemoryPersistence, PersistenceBackend, RunSummary};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Lines of failed-step output shown in quiet mode
const FAILURE_TAIL_LINES: usize = 20;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd).await,
        Command::Validate(cmd) => validate_workflow(cmd),
        Command::List(cmd) => list_workflows(cmd).await.map(|_| ExitCode::SUCCESS),
        Command::History(cmd) => show_history(cmd).await.map(|_| ExitCode::SUCCESS),
    }
}

fn load_config(file: Option<&Path>) -> Result<WorkflowConfig> {
    match file {
        Some(path) => WorkflowConfig::from_file(path)
            .with_context(|| format!("Failed to load workflow {}", path.display())),
        None => WorkflowConfig::builtin(),
    }
}

#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    let store = rust_ci::persistence::SqliteRunStore::with_default_path().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    warn!("Built without the sqlite feature; run history is not kept");
    Ok(Arc::new(InMemoryPersistence::new()))
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run_workflow(cmd: &RunCommand) -> Result<ExitCode> {
    let config = load_config(cmd.file.as_deref())?;
    let mut workflow = config.to_workflow()?;

    println!("{} Loaded workflow: {}", INFO, style(&workflow.name).bold());

    // Overrides land before the run exists, so every step still sees one env
    for (key, value) in &cmd.env {
        workflow.env.insert(key.clone(), value.clone());
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let workdir = cmd
        .workdir
        .canonicalize()
        .with_context(|| format!("Working directory {} not found", cmd.workdir.display()))?;

    let mut event = Event::new(cmd.event.into(), cmd.branch.clone());
    if let Some(sha) = &cmd.sha {
        event = event.with_sha(sha.clone());
    }

    let Some(mut run) = workflow.dispatch(event.clone(), workdir) else {
        println!(
            "{} No trigger of {} matches {} on {}; no run created",
            INFO,
            style(&workflow.name).bold(),
            event.kind,
            style(&event.branch).cyan()
        );
        return Ok(ExitCode::SUCCESS);
    };

    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        match open_history().await {
            Ok(store) => store,
            Err(e) => {
                warn!("Run history unavailable, this run will not be kept: {:#}", e);
                Arc::new(InMemoryPersistence::new())
            }
        }
    };

    let output = Arc::new(TerminalOutputCallback::new(cmd.quiet));
    let mut engine = ExecutionEngine::new(ShellRunner::default()).with_output(output.clone());

    let quiet = cmd.quiet;
    engine.add_event_handler(move |event| {
        match &event {
            ExecutionEvent::StepStarted {
                number, total, name, ..
            } if quiet => {
                output.set_spinner(Some(create_step_spinner(format!(
                    "[{}/{}] {}",
                    number, total, name
                ))));
                return;
            }
            ExecutionEvent::StepSucceeded { .. }
            | ExecutionEvent::StepFailed { .. }
            | ExecutionEvent::RunCompleted { .. } => {
                output.set_spinner(None);
            }
            _ => {}
        }

        if let Some(line) = format_execution_event(&event) {
            println!("{}", line);
        }

        match &event {
            ExecutionEvent::StepStarted { .. } => output.print_separator(),
            ExecutionEvent::StepFailed { output: tail, .. } if quiet && !tail.is_empty() => {
                println!("{}", format_output(tail, FAILURE_TAIL_LINES));
            }
            _ => {}
        }
    });

    let result = engine.execute_until(&mut run, interrupted()).await;

    if record_run(store.as_ref(), &run).await && !cmd.no_history {
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(short_id(&run.state.run_id.to_string())).dim()
        );
    }

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&run.workflow_name).bold(),
                style("successfully").green()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&run.workflow_name).bold(),
                format_status(run.state.status)
            );
            error!("{}", failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<ExitCode> {
    println!("{} Validating workflow...", INFO);

    match load_config(cmd.file.as_deref()) {
        Ok(config) => {
            println!("{} Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            for (event, filter) in [
                ("push", &config.triggers.push),
                ("pull_request", &config.triggers.pull_request),
            ] {
                if let Some(filter) = filter {
                    let branches = match &filter.branches {
                        Some(branches) => branches.join(", "),
                        None => "all branches".to_string(),
                    };
                    println!("  On {}: {}", style(event).cyan(), branches);
                }
            }
            println!("  Environment: {}", style(config.env_map().len()).cyan());
            println!("  Steps: {}", style(config.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn list_workflows(cmd: &ListCommand) -> Result<()> {
    let store = open_history().await?;
    let workflows = store.list_workflows().await?;

    if workflows.is_empty() {
        println!("{} No workflows found in history", INFO);
        return Ok(());
    }

    let mut json_data = Vec::new();
    println!("{} Workflows in history:", INFO);

    for name in &workflows {
        let runs = store.list_runs(name).await?;

        if cmd.with_counts {
            let succeeded = runs
                .iter()
                .filter(|r| r.status == ExecutionStatus::Completed)
                .count();
            let failed = runs
                .iter()
                .filter(|r| r.status == ExecutionStatus::Failed)
                .count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(name).bold(),
                style(runs.len()).cyan(),
                style(succeeded).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(name).bold());
        }

        json_data.push(serde_json::json!({
            "name": name,
            "run_count": runs.len(),
        }));
    }

    if cmd.json {
        let data = serde_json::json!({ "workflows": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_history().await?;

    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;

        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.details)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let mut runs = match &cmd.workflow {
        Some(name) => store.list_runs(name).await?,
        None => {
            let mut all_runs = Vec::new();
            for name in store.list_workflows().await? {
                all_runs.extend(store.list_runs(&name).await?);
            }
            all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            all_runs
        }
    };
    runs.truncate(cmd.limit);

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Run history (latest {}):", INFO, runs.len());
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, details: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!(
        "  Event: {} on {}",
        summary.event_kind,
        style(&summary.branch).cyan()
    );
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Steps: {}/{} succeeded",
        summary.completed_steps, summary.total_steps
    );
    if let Some(step) = &summary.failed_step {
        println!("  Failed at: {}", style(step).red());
    }

    if details {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
