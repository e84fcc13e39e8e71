//! Pipeline API Handlers
//!
//! Triggering runs and reading their state.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use newsreel_core::domain::run::{PipelineRun, TriggerSource};
use newsreel_core::dto::run::{StatusSummary, TriggerOutcome, TriggerResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::context::AppContext;
use crate::service::run_service;

/// POST /pipeline/trigger
/// 202 when a run was started, 409 when one is already in flight
pub async fn trigger_pipeline(
    State(ctx): State<Arc<AppContext>>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    let response = run_service::trigger(&ctx, TriggerSource::Manual).await?;

    let status = match response.outcome {
        TriggerOutcome::Started => StatusCode::ACCEPTED,
        TriggerOutcome::Busy => {
            tracing::info!("Manual trigger rejected: run in progress");
            StatusCode::CONFLICT
        }
    };

    Ok((status, Json(response)))
}

/// GET /pipeline/status
pub async fn pipeline_status(State(ctx): State<Arc<AppContext>>) -> ApiResult<Json<StatusSummary>> {
    let summary = run_service::status(&ctx).await?;
    Ok(Json(summary))
}

/// GET /pipeline/runs/{id}
pub async fn get_run(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&ctx, id).await?;
    Ok(Json(run))
}
