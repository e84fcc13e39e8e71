//! Log API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use newsreel_core::dto::log::LogTail;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::context::AppContext;
use crate::service::log_service;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub lines: Option<usize>,
}

/// GET /logs?lines=N
/// Most recent captured log lines
pub async fn get_logs(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<LogTail>> {
    let tail = log_service::tail(&ctx.logs, query.lines)?;
    Ok(Json(tail))
}
