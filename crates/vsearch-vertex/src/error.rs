//! Vertex AI error types.

use thiserror::Error;

/// Result type for Vertex AI operations.
pub type VertexResult<T> = Result<T, VertexError>;

/// Errors that can occur talking to Vertex AI services.
#[derive(Debug, Error)]
pub enum VertexError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VertexError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error from a non-2xx response.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::Service {
            status,
            body: body.into(),
        }
    }

    /// Check if error is retryable: network failures, throttling, and
    /// server-side 5xx. Client errors are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            VertexError::Network(_) | VertexError::RateLimited(_) => true,
            VertexError::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-requested retry delay, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            VertexError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VertexError::from_status(500, "boom").is_retryable());
        assert!(VertexError::from_status(503, "unavailable").is_retryable());
        assert!(VertexError::RateLimited(1000).is_retryable());
        assert!(!VertexError::from_status(400, "bad request").is_retryable());
        assert!(!VertexError::from_status(404, "no index").is_retryable());
        assert!(!VertexError::auth_error("no creds").is_retryable());
    }

    #[test]
    fn test_service_error_carries_status_and_body() {
        let err = VertexError::from_status(429, "quota exceeded");
        assert_eq!(err.to_string(), "Service returned 429: quota exceeded");
    }
}
