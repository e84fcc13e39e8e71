//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod info;
pub mod logs;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::context::AppContext;

/// Create the main API router with all endpoints
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(info::system_info))
        .route("/health", get(health::health_check))
        .route("/logs", get(logs::get_logs))
        // Pipeline endpoints
        .route("/pipeline/trigger", post(pipeline::trigger_pipeline))
        .route("/pipeline/status", get(pipeline::pipeline_status))
        .route("/pipeline/runs/{id}", get(pipeline::get_run))
        // Add state and middleware
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, wait_idle};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use newsreel_agents::mock::MockAdapters;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_system_info() {
        let app = create_router(context(&MockAdapters::new()));

        let (status, body) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "newsreel-orchestrator");
        assert_eq!(body["status"], "idle");
        assert_eq!(body["run_interval_hours"], 6);
        assert_eq!(body["upload_enabled"], true);
    }

    #[tokio::test]
    async fn test_trigger_twice_returns_conflict() {
        let (mocks, gate) = MockAdapters::new().gated();
        let ctx = context(&mocks);
        let app = create_router(ctx.clone());

        let (status, first) = send(&app, "POST", "/pipeline/trigger").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(first["outcome"], "started");

        let (status, second) = send(&app, "POST", "/pipeline/trigger").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(second["outcome"], "busy");

        let (_, summary) = send(&app, "GET", "/pipeline/status").await;
        assert_eq!(summary["state"], "running");
        assert_eq!(summary["stats"]["runs"], 1);

        gate.open();
        wait_idle(&ctx).await;

        let uri = format!("/pipeline/runs/{}", first["run_id"].as_str().unwrap());
        let (status, run) = send(&app, "GET", &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], "succeeded");
        assert_eq!(run["upload"]["status"], "uploaded");
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let app = create_router(context(&MockAdapters::new()));

        let uri = format!("/pipeline/runs/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, "GET", &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_health_status_codes() {
        let mocks = MockAdapters::new();
        let app = create_router(context(&mocks));

        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overall"], "healthy");

        mocks.speech.state.set_unreachable(true);
        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["overall"], "degraded");
    }

    #[tokio::test]
    async fn test_logs_limit() {
        let ctx = context(&MockAdapters::new());
        let app = create_router(ctx.clone());

        let (status, body) = send(&app, "GET", "/logs?lines=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], ctx.config.log_capacity);

        let uri = format!("/logs?lines={}", ctx.config.log_capacity + 1);
        let (status, body) = send(&app, "GET", &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
