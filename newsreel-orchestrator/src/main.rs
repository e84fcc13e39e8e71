use anyhow::Context;
use clap::{Parser, Subcommand};
use newsreel_core::domain::run::{RunStatus, TriggerSource};
use std::process::ExitCode;
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod guard;
pub mod logs;
pub mod repository;
pub mod scheduler;
pub mod service;

use crate::config::ServiceConfig;
use crate::context::AppContext;
use crate::logs::LogBuffer;
use crate::service::run_service;

#[derive(Parser)]
#[command(name = "newsreel-orchestrator", version, about = "News-to-video automation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run the pipeline on schedule (default)
    Serve,
    /// Run the pipeline once in the foreground and exit
    RunOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ServiceConfig::from_env().context("Invalid configuration")?;
    let logs = LogBuffer::new(config.log_capacity);
    logs::init(&config.log_dir, logs.clone())?;

    tracing::info!("Starting Newsreel Orchestrator...");

    let ctx = AppContext::init(config, logs).await?;

    let code = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(ctx.clone()).await?,
        Command::RunOnce => run_once(&ctx).await?,
    };

    ctx.shutdown().await;
    Ok(code)
}

async fn serve(ctx: Arc<AppContext>) -> anyhow::Result<ExitCode> {
    let scheduler = scheduler::spawn(ctx.clone());
    let app = api::create_router(ctx.clone());

    let addr = ctx.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Listening on {}", addr);

    let signal_ctx = ctx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => signal_ctx.begin_shutdown(),
                _ = context::stopped(signal_ctx.shutdown_signal()) => {}
            }
        })
        .await
        .context("Server error")?;

    ctx.begin_shutdown();
    if let Err(e) = scheduler.await {
        tracing::error!("Scheduler task failed: {}", e);
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_once(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    let run = run_service::run_now(ctx, TriggerSource::Manual)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to record run: {:?}", e))?
        .context("A pipeline run is already in progress")?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    Ok(match run.status {
        RunStatus::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
