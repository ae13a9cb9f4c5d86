//! Error types for the OCS client.

use thiserror::Error;

/// OCS client errors.
#[derive(Debug, Error)]
pub enum OcsError {
    /// Endpoint or credential missing; raised before any network call
    #[error("OCS configuration error: {0}")]
    Config(String),

    /// Non-success HTTP response from the charging system
    #[error("OCS HTTP {status} :: {body}")]
    UpstreamHttp {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not valid JSON or does not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response did not contain the payload for the requested operation
    #[error("response is missing the `{0}` payload")]
    MissingPayload(String),

    /// The request limiter was shut down
    #[error("request limiter closed")]
    LimiterClosed,
}

impl OcsError {
    /// Build an [`OcsError::UpstreamHttp`] from a status and body.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        OcsError::UpstreamHttp {
            status,
            body: body.into(),
        }
    }

    /// HTTP status, if this error came from an upstream response.
    pub fn status(&self) -> Option<u16> {
        match self {
            OcsError::UpstreamHttp { status, .. } => Some(*status),
            OcsError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, OcsError::Config(_))
    }

    /// Check if retrying the same request could succeed.
    ///
    /// The client itself never retries; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            OcsError::UpstreamHttp { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            OcsError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            OcsError::Config(msg) => format!(
                "OCS is not configured: {}. Set it in the config file or via OCS_BASE_URL / OCS_TOKEN.",
                msg
            ),
            OcsError::UpstreamHttp { status: 401 | 403, .. } => {
                "OCS rejected the token. Check OCS_TOKEN.".to_string()
            }
            OcsError::UpstreamHttp { status, body } => {
                format!("OCS returned HTTP {}: {}", status, body)
            }
            OcsError::Http(e) if e.is_timeout() => "OCS request timed out.".to_string(),
            OcsError::Http(e) if e.is_connect() => {
                "Could not connect to OCS. Check OCS_BASE_URL.".to_string()
            }
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for OCS operations.
pub type Result<T> = std::result::Result<T, OcsError>;
