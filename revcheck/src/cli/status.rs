// revcheck/src/cli/status.rs
use std::time::Instant;

use colored::*;
use revcheck_common::pipeline::{CheckOutcome, PipelineEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Installing,
    Installed,
    Checking,
    Passed,
    Skipped,
    Failed,
}

impl LineState {
    fn display_state(&self) -> &'static str {
        match self {
            LineState::Installing => "installing",
            LineState::Installed => "installed",
            LineState::Checking => "checking",
            LineState::Passed => "passed",
            LineState::Skipped => "skipped",
            LineState::Failed => "failed",
        }
    }

    fn indicator(&self) -> String {
        match self {
            LineState::Installing | LineState::Checking => "⚙".blue().to_string(),
            LineState::Installed => "✓".green().to_string(),
            LineState::Passed => "✓".green().bold().to_string(),
            LineState::Skipped => "–".yellow().to_string(),
            LineState::Failed => "✗".red().bold().to_string(),
        }
    }

    fn colored_state(&self) -> ColoredString {
        let label = format!("{:<10}", self.display_state());
        match self {
            LineState::Installing | LineState::Checking => label.blue(),
            LineState::Installed => label.green(),
            LineState::Passed => label.green().bold(),
            LineState::Skipped => label.yellow(),
            LineState::Failed => label.red().bold(),
        }
    }

    fn from_outcome(outcome: &CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Passed => LineState::Passed,
            CheckOutcome::Skipped(_) => LineState::Skipped,
            CheckOutcome::Failed(_) => LineState::Failed,
        }
    }
}

fn print_line(state: LineState, prefix: &str, name: &str, detail: &str) {
    println!(
        "{} {} {}{} {}",
        state.indicator(),
        state.colored_state(),
        prefix.dimmed(),
        name.cyan(),
        detail
    );
}

/// Prints pipeline progress until the run finishes or every sender is gone.
pub async fn handle_events(mut event_rx: broadcast::Receiver<PipelineEvent>) {
    let start_time = Instant::now();
    let mut total_jobs = 0usize;
    let mut logs_buffer: Vec<String> = Vec::new();

    loop {
        match event_rx.recv().await {
            Ok(event) => match event {
                PipelineEvent::PhaseStarted { phase } => {
                    println!("{}{}", "==> ".bold().blue(), phase.to_string().bold());
                }
                PipelineEvent::InstallStarted { name } => {
                    print_line(LineState::Installing, "", &name, "");
                }
                PipelineEvent::InstallFinished { name } => {
                    print_line(LineState::Installed, "", &name, "");
                }
                PipelineEvent::InstallFailed { name, error } => {
                    print_line(LineState::Failed, "", &name, "");
                    logs_buffer.push(format!(
                        "{} {}: {}",
                        "Install failed:".red(),
                        name.cyan(),
                        error.red()
                    ));
                }
                PipelineEvent::PipelineStarted {
                    total_jobs: total,
                    concurrency,
                } => {
                    total_jobs = total;
                    println!(
                        "{} {} packages with {} worker(s)",
                        "Checking".bold(),
                        total,
                        concurrency
                    );
                }
                PipelineEvent::DownloadFinished { name, path } => {
                    println!(
                        "{} {} {}",
                        "↓".dimmed(),
                        name.cyan(),
                        path.display().to_string().dimmed()
                    );
                }
                PipelineEvent::CheckStarted { index, name } => {
                    let prefix = format!("[{index}/{total_jobs}] ");
                    print_line(LineState::Checking, &prefix, &name, "");
                }
                PipelineEvent::CheckFinished {
                    index,
                    name,
                    outcome,
                    elapsed_secs,
                } => {
                    let prefix = format!("[{index}/{total_jobs}] ");
                    let detail = format!("{elapsed_secs:.1}s").dimmed().to_string();
                    print_line(LineState::from_outcome(&outcome), &prefix, &name, &detail);
                    match &outcome {
                        CheckOutcome::Failed(reason) => logs_buffer.push(format!(
                            "{} {}: {}",
                            "✗".red().bold(),
                            name.cyan(),
                            reason.red()
                        )),
                        CheckOutcome::Skipped(reason) => logs_buffer.push(format!(
                            "{} {}: {}",
                            "–".yellow(),
                            name.cyan(),
                            reason
                        )),
                        CheckOutcome::Passed => {}
                    }
                }
                PipelineEvent::LogInfo { message } => {
                    println!("{message}");
                }
                PipelineEvent::LogWarn { message } => {
                    eprintln!("{} {}", "Warning:".yellow().bold(), message);
                }
                PipelineEvent::LogError { message } => {
                    eprintln!("{} {}", "Error:".red().bold(), message.red());
                }
                PipelineEvent::PipelineFinished {
                    duration_secs,
                    passed,
                    failed,
                    skipped,
                    ..
                } => {
                    println!();
                    if !logs_buffer.is_empty() {
                        for log in &logs_buffer {
                            println!("{log}");
                        }
                        println!();
                    }
                    println!(
                        "{}: {}  {}: {}  {}: {}  {}: {}  {}: {:.2}s (total {:.2}s)",
                        "Total".bold(),
                        total_jobs,
                        "Passed".green().bold(),
                        passed,
                        "Failed".red().bold(),
                        failed,
                        "Skipped".yellow().bold(),
                        skipped,
                        "Checks".bold(),
                        duration_secs,
                        start_time.elapsed().as_secs_f64()
                    );
                    break;
                }
            },
            Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(n)) => {
                tracing::warn!("Status display skipped {} events", n);
            }
        }
    }
}
