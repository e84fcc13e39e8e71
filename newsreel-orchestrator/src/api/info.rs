//! System Info API Handler

use axum::{Json, extract::State};
use newsreel_core::dto::info::SystemInfo;
use std::sync::Arc;

use crate::context::AppContext;

const FEATURES: [&str; 7] = [
    "news collection (RSS, NewsAPI)",
    "summarization",
    "translation",
    "text-to-speech",
    "stock media",
    "video assembly",
    "youtube upload",
];

/// GET /
pub async fn system_info(State(ctx): State<Arc<AppContext>>) -> Json<SystemInfo> {
    Json(SystemInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if ctx.guard.is_busy() { "running" } else { "idle" }.to_string(),
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
        run_interval_hours: ctx.config.run_interval_hours(),
        upload_enabled: ctx.pipeline.settings().upload_enabled,
        started_at: ctx.started_at,
    })
}
