//! Periodic trigger
//!
//! Starts a run every `run_interval` through the same path as the manual
//! trigger. A tick that lands while a run is in flight is skipped.

use newsreel_core::domain::run::TriggerSource;
use newsreel_core::dto::run::TriggerOutcome;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::context::{self, AppContext};
use crate::service::run_service;

/// Spawns the scheduling loop; it ends when shutdown begins
pub fn spawn(ctx: Arc<AppContext>) -> JoinHandle<()> {
    tokio::spawn(async move { run(ctx).await })
}

async fn run(ctx: Arc<AppContext>) {
    let period = ctx.config.run_interval;
    let start = if ctx.config.run_on_startup {
        Instant::now()
    } else {
        Instant::now() + period
    };

    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stopped = context::stopped(ctx.shutdown_signal());
    tokio::pin!(stopped);

    tracing::info!(
        interval_hours = ctx.config.run_interval_hours(),
        run_on_startup = ctx.config.run_on_startup,
        "Scheduler started"
    );

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = ticker.tick() => fire(&ctx).await,
        }
    }

    tracing::info!("Scheduler stopped");
}

async fn fire(ctx: &Arc<AppContext>) {
    match run_service::trigger(ctx, TriggerSource::Scheduled).await {
        Ok(response) if response.outcome == TriggerOutcome::Busy => {
            tracing::info!("Scheduled run skipped: a run is already in progress");
        }
        Ok(response) => {
            tracing::info!(run_id = ?response.run_id, "Scheduled run started");
        }
        Err(e) => tracing::error!("Scheduled run could not start: {:?}", e),
    }
}
