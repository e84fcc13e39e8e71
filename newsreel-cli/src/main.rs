//! Newsreel CLI
//!
//! Command-line interface for the newsreel orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "newsreel")]
#[command(about = "Newsreel news-to-video service CLI", long_about = None)]
struct Cli {
    /// Service URL
    #[arg(
        long,
        env = "NEWSREEL_SERVICE_URL",
        default_value = "http://localhost:8000"
    )]
    service_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        service_url: cli.service_url,
    };

    handle_command(cli.command, &config).await
}
