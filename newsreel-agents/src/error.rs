//! Error types for the adapters

use newsreel_core::domain::run::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors raised by an adapter or by stage validation
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The call did not complete within the configured timeout
    #[error("{adapter}: request timed out after {after:?}")]
    Timeout {
        adapter: &'static str,
        after: Duration,
    },

    /// The provider rejected the credential
    #[error("{adapter}: authentication failed: {message}")]
    AuthFailure {
        adapter: &'static str,
        message: String,
    },

    /// The provider asked us to slow down
    #[error("{adapter}: rate limited")]
    RateLimited {
        adapter: &'static str,
        retry_after: Option<Duration>,
    },

    /// No credential configured for the adapter
    #[error("{adapter}: credential not configured")]
    MissingCredential { adapter: &'static str },

    /// Transport-level failure
    #[error("{adapter}: HTTP request failed: {source}")]
    Request {
        adapter: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider returned an unexpected status code
    #[error("{adapter}: API error (status {status}): {message}")]
    Api {
        adapter: &'static str,
        status: u16,
        message: String,
    },

    /// The provider response could not be decoded
    #[error("{adapter}: failed to parse response: {message}")]
    Parse {
        adapter: &'static str,
        message: String,
    },

    /// Empty or malformed stage input or output
    #[error("validation failed: {0}")]
    Validation(String),

    /// Media composition failed
    #[error("video assembly failed: {0}")]
    Assembly(String),

    /// The hosting platform refused the upload
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Wraps a reqwest error, classifying timeouts
    pub fn request(adapter: &'static str, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                adapter,
                after: timeout,
            }
        } else {
            Self::Request {
                adapter,
                source: err,
            }
        }
    }

    pub fn parse(adapter: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            adapter,
            message: message.to_string(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RateLimited { .. })
    }

    /// Delay requested by the provider before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Error classification recorded on the failed run
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::AdapterTimeout,
            Self::AuthFailure { .. } => ErrorKind::AdapterAuthFailure,
            Self::RateLimited { .. } => ErrorKind::AdapterRateLimited,
            Self::MissingCredential { .. }
            | Self::Request { .. }
            | Self::Api { .. }
            | Self::Parse { .. } => ErrorKind::AdapterUnavailable,
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::Assembly(_) => ErrorKind::AssemblyFailure,
            Self::UploadRejected(_) => ErrorKind::UploadRejected,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(
            AdapterError::Timeout {
                adapter: "speech",
                after: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(
            AdapterError::RateLimited {
                adapter: "llm",
                retry_after: None
            }
            .is_transient()
        );
        assert!(
            !AdapterError::AuthFailure {
                adapter: "llm",
                message: "bad key".to_string()
            }
            .is_transient()
        );
        assert!(!AdapterError::Validation("empty".to_string()).is_transient());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AdapterError::MissingCredential { adapter: "upload" }.kind(),
            ErrorKind::AdapterUnavailable
        );
        assert_eq!(
            AdapterError::Assembly("ffmpeg exited 1".to_string()).kind(),
            ErrorKind::AssemblyFailure
        );
        assert_eq!(
            AdapterError::UploadRejected("quota".to_string()).kind(),
            ErrorKind::UploadRejected
        );
    }

    #[test]
    fn test_error_message_names_adapter() {
        let err = AdapterError::Api {
            adapter: "media",
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "media: API error (status 500): boom");
    }
}
