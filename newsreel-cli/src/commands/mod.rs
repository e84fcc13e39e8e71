//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod system;

use anyhow::Result;
use clap::Subcommand;
use newsreel_client::ServiceClient;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show service name, version and schedule
    Info,
    /// Start a pipeline run
    Trigger,
    /// Show service state, counters and recent runs
    Status,
    /// Show one run with its stages
    Run {
        /// Run ID
        id: Uuid,
    },
    /// Show adapter and datastore reachability
    Health,
    /// Show recent service log lines
    Logs {
        /// Number of lines
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = ServiceClient::new(&config.service_url);

    match command {
        Commands::Info => system::show_info(&client).await,
        Commands::Trigger => pipeline::trigger(&client).await,
        Commands::Status => pipeline::show_status(&client).await,
        Commands::Run { id } => pipeline::show_run(&client, id).await,
        Commands::Health => system::show_health(&client).await,
        Commands::Logs { lines } => system::show_logs(&client, lines).await,
    }
}
