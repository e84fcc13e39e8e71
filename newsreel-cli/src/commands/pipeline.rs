//! Pipeline command handlers

use anyhow::Result;
use colored::*;
use newsreel_client::ServiceClient;
use newsreel_core::domain::run::{PipelineRun, RunStatus, StageStatus, UploadOutcome};
use newsreel_core::dto::run::{RunSummary, ServiceState, TriggerOutcome};
use uuid::Uuid;

pub async fn trigger(client: &ServiceClient) -> Result<()> {
    let response = client.trigger().await?;

    match response.outcome {
        TriggerOutcome::Started => {
            println!("{}", "✓ Pipeline run started".green().bold());
        }
        TriggerOutcome::Busy => {
            println!("{}", format!("⚠ {}", response.message).yellow().bold());
        }
    }
    if let Some(id) = response.run_id {
        println!("  Run ID: {}", id.to_string().cyan());
    }

    Ok(())
}

pub async fn show_status(client: &ServiceClient) -> Result<()> {
    let summary = client.status().await?;

    let state = match summary.state {
        ServiceState::Idle => "idle".green(),
        ServiceState::Running => "running".cyan(),
    };
    println!("{} {}", "Service:".bold(), state);
    println!(
        "  Runs: {}   Succeeded: {}   Failed: {}   Success rate: {:.1}%",
        summary.stats.runs,
        summary.stats.successes.to_string().green(),
        summary.stats.failures.to_string().red(),
        summary.success_rate
    );

    if let Some(run) = &summary.current_run {
        println!();
        println!("{}", "Current run:".bold());
        print_run(run);
    }

    if summary.recent_runs.is_empty() {
        println!();
        println!("{}", "No runs yet.".yellow());
    } else {
        println!();
        println!("{}", "Recent runs:".bold());
        for run in &summary.recent_runs {
            print_run_summary(run);
        }
    }

    Ok(())
}

pub async fn show_run(client: &ServiceClient, id: Uuid) -> Result<()> {
    let run = client.run(id).await?;
    print_run(&run);
    Ok(())
}

fn print_run(run: &PipelineRun) {
    println!("  {} Run {}", "▸".cyan(), run.id.to_string().bold());
    println!("    Status:     {}", colorize_status(run.status));
    println!("    Trigger:    {:?}", run.trigger);
    println!(
        "    Requested:  {}",
        run.requested_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(duration) = run.duration_seconds() {
        println!("    Duration:   {:.1}s", duration);
    }

    println!("    Stages:");
    for record in &run.stages {
        let status = format!("{:?}", record.status);
        let status = match record.status {
            StageStatus::Pending => status.dimmed(),
            StageStatus::Running => status.cyan(),
            StageStatus::Success => status.green(),
            StageStatus::Failed => status.red(),
            StageStatus::Skipped => status.yellow(),
        };
        match &record.message {
            Some(message) => println!("      {:<18} {}  {}", record.stage.name(), status, message.dimmed()),
            None => println!("      {:<18} {}", record.stage.name(), status),
        }
    }

    if let Some(artifact) = &run.artifact {
        println!(
            "    Video:      {} ({:.1}s, {}x{})",
            artifact.path.display(),
            artifact.duration_seconds,
            artifact.width,
            artifact.height
        );
    }
    match &run.upload {
        Some(UploadOutcome::Uploaded { url, .. }) => println!("    Uploaded:   {}", url.green()),
        Some(UploadOutcome::Skipped { reason }) => {
            println!("    Upload:     {}", format!("skipped ({})", reason).yellow())
        }
        None => {}
    }
    if let Some(failure) = &run.failure {
        println!(
            "    {}     {} at {}: {}",
            "Error:".red().bold(),
            failure.kind,
            failure.stage,
            failure.message
        );
    }
}

fn print_run_summary(run: &RunSummary) {
    let detail = match (&run.failure, &run.upload) {
        (Some(failure), _) => format!("{} at {}", failure.kind, failure.stage).red(),
        (None, Some(upload)) => match upload.confirmation_id() {
            Some(id) => format!("uploaded {}", id).green(),
            None => "upload skipped".yellow(),
        },
        (None, None) => run
            .current_stage
            .map(|s| s.to_string())
            .unwrap_or_default()
            .dimmed(),
    };

    println!(
        "  {} {}  {}  {}",
        run.requested_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .dimmed(),
        run.id,
        colorize_status(run.status),
        detail
    );
}

fn colorize_status(status: RunStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        RunStatus::Pending => status_str.yellow(),
        RunStatus::Running => status_str.cyan(),
        RunStatus::Succeeded => status_str.green(),
        RunStatus::Failed => status_str.red(),
    }
}
