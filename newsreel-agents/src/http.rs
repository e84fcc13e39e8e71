//! Shared HTTP helpers for the adapters

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::error::{AdapterError, Result};

const USER_AGENT: &str = concat!("newsreel/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by every adapter
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Maps a non-success status into the adapter error taxonomy
///
/// 401/403 become `AuthFailure`, 429 becomes `RateLimited` (honouring a
/// `Retry-After` header in seconds), anything else becomes `Api`.
pub async fn check_response(adapter: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(classify_status(adapter, status, message, retry_after))
}

pub(crate) fn classify_status(
    adapter: &'static str,
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> AdapterError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AdapterError::AuthFailure { adapter, message }
        }
        StatusCode::TOO_MANY_REQUESTS => AdapterError::RateLimited {
            adapter,
            retry_after,
        },
        _ => AdapterError::Api {
            adapter,
            status: status.as_u16(),
            message,
        },
    }
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Canned provider endpoints for wire-level adapter tests
#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL
    pub async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
