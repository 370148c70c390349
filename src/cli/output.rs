//! CLI output formatting

use crate::{core::ExecutionStatus, execution::ExecutionEvent, persistence::RunSummary};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for a running step
pub fn create_step_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("SUCCESS").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        _ => INFO,
    };

    let mut line = format!(
        "{} {} - {} - {} {} - {} ({}/{})",
        status_icon,
        style(short_id(&summary.run_id.to_string())).dim(),
        style(&summary.workflow_name).bold(),
        summary.event_kind,
        style(&summary.branch).cyan(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
    );
    if let Some(step) = &summary.failed_step {
        line.push_str(&format!(" at {}", style(step).red()));
    }
    line
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::RunStarted {
            run_id,
            workflow_name,
            event,
        } => format!(
            "{} Running {} for {} on {} ({})",
            ROCKET,
            style(workflow_name).bold(),
            event.kind,
            style(&event.branch).cyan(),
            style(short_id(&run_id.to_string())).dim()
        ),
        ExecutionEvent::StepStarted {
            number,
            total,
            name,
            command,
        } => format!(
            "\n[{}/{}] {} {}",
            style(number).cyan(),
            style(total).dim(),
            style(name).bold(),
            style(format!("$ {}", command)).dim()
        ),
        ExecutionEvent::StepSucceeded { name, duration } => format!(
            "{} {} {}",
            CHECK,
            style(name).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::StepFailed { name, error, .. } => {
            format!("{} {}: {}", CROSS, style(name).red(), style(error).dim())
        }
        ExecutionEvent::StepSkipped { name, reason } => {
            format!("{} {} ({})", SKIP, style(name).dim(), reason)
        }
        // the final status line is printed by the caller
        ExecutionEvent::RunCompleted { .. } => return None,
    };
    Some(line)
}

/// Format step output with truncation
pub fn format_output(lines: &[String], max_lines: usize) -> String {
    if lines.len() <= max_lines {
        lines.join("\n")
    } else {
        let skipped = lines.len() - max_lines;
        format!(
            "{}\n{}",
            style(format!("... ({} earlier lines)", skipped)).dim(),
            lines[skipped..].join("\n")
        )
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// First 8 characters of an id
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
