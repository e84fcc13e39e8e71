//! Info, health and log endpoints

use newsreel_core::domain::health::HealthReport;
use newsreel_core::dto::info::SystemInfo;
use newsreel_core::dto::log::LogTail;
use reqwest::StatusCode;

use crate::ServiceClient;
use crate::error::Result;

impl ServiceClient {
    pub async fn info(&self) -> Result<SystemInfo> {
        let response = self.client.get(self.url("/")).send().await?;
        self.handle_response(response).await
    }

    /// Health report; an unhealthy service (503) still returns its report
    pub async fn health(&self) -> Result<HealthReport> {
        let response = self.client.get(self.url("/health")).send().await?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Self::parse(response).await;
        }
        self.handle_response(response).await
    }

    /// The last `lines` log lines, or the service default
    pub async fn logs(&self, lines: Option<usize>) -> Result<LogTail> {
        let mut request = self.client.get(self.url("/logs"));
        if let Some(lines) = lines {
            request = request.query(&[("lines", lines)]);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use crate::testing::serve;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use newsreel_core::domain::health::Reachability;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_unhealthy_service_returns_report() {
        let body = r#"{
            "overall": "degraded",
            "components": [
                {"name": "speech", "status": "healthy", "detail": null},
                {"name": "upload", "status": "unreachable", "detail": "credential not configured"}
            ],
            "checked_at": "2026-10-17T06:00:00Z"
        }"#;
        let app = Router::new().route(
            "/health",
            get(move || async move { (StatusCode::SERVICE_UNAVAILABLE, body) }),
        );
        let client = ServiceClient::new(serve(app).await);

        let report = client.health().await.unwrap();
        assert_eq!(report.overall, Reachability::Degraded);
        assert_eq!(
            report.component("upload").map(|c| c.status),
            Some(Reachability::Unreachable)
        );
    }

    #[tokio::test]
    async fn test_logs_over_capacity_is_client_error() {
        let app = Router::new().route(
            "/logs",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let lines = query.get("lines").cloned().unwrap_or_default();
                (
                    StatusCode::BAD_REQUEST,
                    format!(r#"{{"error":"Requested {} lines"}}"#, lines),
                )
            }),
        );
        let client = ServiceClient::new(serve(app).await);

        let err = client.logs(Some(5000)).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, ClientError::ApiError { message, .. } if message == "Requested 5000 lines"));
    }
}
