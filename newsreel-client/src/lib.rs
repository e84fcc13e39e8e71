//! Newsreel HTTP Client
//!
//! A type-safe HTTP client for the newsreel orchestrator API, used by the
//! `newsreel` CLI.
//!
//! # Example
//!
//! ```no_run
//! use newsreel_client::ServiceClient;
//! use newsreel_core::dto::run::TriggerOutcome;
//!
//! #[tokio::main]
//! async fn main() -> newsreel_client::Result<()> {
//!     let client = ServiceClient::new("http://localhost:8000");
//!
//!     let response = client.trigger().await?;
//!     if response.outcome == TriggerOutcome::Busy {
//!         println!("A run is already in progress");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipeline;
mod system;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the newsreel orchestrator API
#[derive(Debug, Clone)]
pub struct ServiceClient {
    /// Base URL of the service (e.g., "http://localhost:8000")
    base_url: String,
    client: Client,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client around a configured reqwest `Client` (timeouts, proxies, TLS)
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Deserializes a successful response, or turns the status into an error
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves a canned service on an ephemeral local port and returns its base URL
    pub async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
