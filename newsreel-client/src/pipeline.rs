//! Pipeline endpoints

use newsreel_core::domain::run::PipelineRun;
use newsreel_core::dto::run::{StatusSummary, TriggerResponse};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::ServiceClient;
use crate::error::Result;

impl ServiceClient {
    /// Start a run
    ///
    /// A `409 Conflict` is not an error: it decodes to the busy outcome.
    pub async fn trigger(&self) -> Result<TriggerResponse> {
        let response = self.client.post(self.url("/pipeline/trigger")).send().await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::debug!("Service is busy");
            return Self::parse(response).await;
        }
        self.handle_response(response).await
    }

    /// Service state, counters and recent runs
    pub async fn status(&self) -> Result<StatusSummary> {
        let response = self.client.get(self.url("/pipeline/status")).send().await?;
        self.handle_response(response).await
    }

    /// One run from the history
    pub async fn run(&self, id: Uuid) -> Result<PipelineRun> {
        let response = self
            .client
            .get(self.url(&format!("/pipeline/runs/{}", id)))
            .send()
            .await?;
        self.handle_response(response).await
    }
}
