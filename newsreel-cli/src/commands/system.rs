//! Info, health and log command handlers

use anyhow::Result;
use colored::*;
use newsreel_client::ServiceClient;
use newsreel_core::domain::health::Reachability;
use newsreel_core::domain::log::LogLevel;

pub async fn show_info(client: &ServiceClient) -> Result<()> {
    let info = client.info().await?;

    println!("{} {}", info.name.bold(), info.version.dimmed());
    println!("  Status:    {}", info.status);
    println!("  Schedule:  every {} hour(s)", info.run_interval_hours);
    println!(
        "  Upload:    {}",
        if info.upload_enabled {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );
    println!("  Features:  {}", info.features.join(", "));

    Ok(())
}

pub async fn show_health(client: &ServiceClient) -> Result<()> {
    let report = client.health().await?;

    println!("{} {}", "Overall:".bold(), colorize(report.overall));
    for component in &report.components {
        println!(
            "  {:<10} {}  {}",
            component.name,
            colorize(component.status),
            component.detail.as_deref().unwrap_or_default().dimmed()
        );
    }

    Ok(())
}

pub async fn show_logs(client: &ServiceClient, lines: Option<usize>) -> Result<()> {
    let tail = client.logs(lines).await?;

    if tail.lines.is_empty() {
        println!("{}", "No log lines captured yet.".yellow());
        return Ok(());
    }

    for log in &tail.lines {
        let level_str = log.level.to_string();
        let level_colored = match log.level {
            LogLevel::Debug => level_str.dimmed(),
            LogLevel::Info => level_str.cyan(),
            LogLevel::Warning => level_str.yellow(),
            LogLevel::Error => level_str.red(),
        };

        println!(
            "{} [{}] {} {}",
            log.timestamp.format("%H:%M:%S").to_string().dimmed(),
            level_colored,
            log.target.dimmed(),
            log.message
        );
    }

    Ok(())
}

fn colorize(status: Reachability) -> ColoredString {
    let status_str = status.to_string();
    match status {
        Reachability::Healthy => status_str.green(),
        Reachability::Degraded => status_str.yellow(),
        Reachability::Unreachable => status_str.red(),
    }
}
