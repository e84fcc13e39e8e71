//! Health Check API Handler

use axum::{Json, extract::State, http::StatusCode};
use newsreel_core::domain::health::{HealthReport, Reachability};
use std::sync::Arc;

use crate::context::AppContext;
use crate::service::health_service;

/// GET /health
/// 200 when every component is healthy, 503 otherwise
pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<HealthReport>) {
    let report = health_service::check(&ctx).await;

    let status = if report.overall == Reachability::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}
