//! Run Service
//!
//! Starting pipeline runs and reporting on them.

use async_trait::async_trait;
use futures::FutureExt;
use newsreel_agents::RunObserver;
use newsreel_core::domain::run::{ErrorKind, PipelineRun, TriggerSource};
use newsreel_core::dto::run::{
    RunSummary, ServiceState, StatusSummary, TriggerOutcome, TriggerResponse,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::guard::RunPermit;

/// Number of runs listed in the status summary
pub const RECENT_RUNS: usize = 10;

/// Service error type
#[derive(Debug)]
pub enum RunError {
    NotFound(Uuid),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Keeps the current-run snapshot and the history up to date
struct HistoryRecorder<'a> {
    ctx: &'a AppContext,
}

#[async_trait]
impl RunObserver for HistoryRecorder<'_> {
    async fn on_update(&self, run: &PipelineRun) {
        *self.ctx.current.write().await = Some(run.clone());
        if let Err(e) = self.ctx.runs.save(run).await {
            tracing::warn!(run_id = %run.id, "Failed to persist run: {}", e);
        }
    }
}

/// Claims the run slot and records a new pending run
///
/// Returns `None` without touching the history when a run is in flight.
async fn admit(ctx: &AppContext, source: TriggerSource) -> Result<Option<(RunPermit, PipelineRun)>> {
    let Some(permit) = ctx.guard.try_acquire() else {
        return Ok(None);
    };

    let run = PipelineRun::new(source);
    ctx.runs.save(&run).await?;
    *ctx.current.write().await = Some(run.clone());

    Ok(Some((permit, run)))
}

/// Runs the pipeline and settles the run even if it panics
///
/// The caller holds the run permit until this returns, so the history never
/// shows a run left `running` once the slot is free again.
async fn execute(ctx: &AppContext, mut run: PipelineRun) -> PipelineRun {
    let recorder = HistoryRecorder { ctx };
    let outcome = AssertUnwindSafe(ctx.pipeline.run(&mut run, &recorder))
        .catch_unwind()
        .await;

    if outcome.is_err() {
        tracing::error!(run_id = %run.id, stage = ?run.current_stage, "Pipeline run panicked");
        if !run.is_terminal() {
            run.abort(ErrorKind::Internal, "run task panicked");
        }
        if let Err(e) = ctx.runs.save(&run).await {
            tracing::warn!(run_id = %run.id, "Failed to persist run: {}", e);
        }
    }

    *ctx.current.write().await = None;
    run
}

async fn busy(ctx: &AppContext) -> TriggerResponse {
    let run_id = ctx.current.read().await.as_ref().map(|r| r.id);
    TriggerResponse {
        outcome: TriggerOutcome::Busy,
        run_id,
        message: "A pipeline run is already in progress".to_string(),
    }
}

/// Starts a run in the background unless one is already in flight
pub async fn trigger(ctx: &Arc<AppContext>, source: TriggerSource) -> Result<TriggerResponse> {
    let Some((permit, run)) = admit(ctx, source).await? else {
        return Ok(busy(ctx).await);
    };

    let run_id = run.id;
    tracing::info!(%run_id, ?source, "Pipeline run triggered");

    let task_ctx = ctx.clone();
    tokio::spawn(async move {
        let _permit = permit;
        execute(&task_ctx, run).await;
    });

    Ok(TriggerResponse {
        outcome: TriggerOutcome::Started,
        run_id: Some(run_id),
        message: "Pipeline run started".to_string(),
    })
}

/// Runs the pipeline in the foreground; `None` when a run is in flight
pub async fn run_now(ctx: &AppContext, source: TriggerSource) -> Result<Option<PipelineRun>> {
    let Some((_permit, run)) = admit(ctx, source).await? else {
        return Ok(None);
    };

    Ok(Some(execute(ctx, run).await))
}

pub async fn status(ctx: &AppContext) -> Result<StatusSummary> {
    let state = if ctx.guard.is_busy() {
        ServiceState::Running
    } else {
        ServiceState::Idle
    };

    let current_run = ctx.current.read().await.clone();
    let last_run = ctx.runs.last_finished().await?;
    let stats = ctx.runs.stats().await?;
    let recent_runs = ctx
        .runs
        .recent(RECENT_RUNS)
        .await?
        .iter()
        .map(RunSummary::from)
        .collect();

    Ok(StatusSummary {
        state,
        current_run,
        last_run,
        success_rate: stats.success_rate(),
        stats,
        recent_runs,
    })
}

pub async fn get_run(ctx: &AppContext, id: Uuid) -> Result<PipelineRun> {
    ctx.runs.find(id).await?.ok_or(RunError::NotFound(id))
}
