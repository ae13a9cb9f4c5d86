//! Error types for the aggregation pipeline.

use chrono::NaiveDate;
use teltrip_ocs::OcsError;
use thiserror::Error;

/// Aggregation errors.
#[derive(Debug, Error)]
pub enum UsageError {
    /// No usable account identifier (neither argument nor default)
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream failure (configuration, HTTP status, transport, decoding)
    #[error(transparent)]
    Ocs(#[from] OcsError),

    /// A usage window failed under the fail-fast window policy
    #[error("usage query for subscriber {subscriber_id} over {start}..{end} failed: {source}")]
    Window {
        subscriber_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        #[source]
        source: OcsError,
    },
}

impl UsageError {
    /// The upstream error behind this one, if any.
    pub fn upstream(&self) -> Option<&OcsError> {
        match self {
            UsageError::Ocs(e) | UsageError::Window { source: e, .. } => Some(e),
            UsageError::Validation(_) => None,
        }
    }

    /// Check if this is a configuration or validation error, i.e. one raised
    /// before any upstream request.
    pub fn is_setup_error(&self) -> bool {
        match self {
            UsageError::Validation(_) => true,
            UsageError::Ocs(e) => e.is_config_error(),
            UsageError::Window { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            UsageError::Validation(msg) => msg.clone(),
            UsageError::Ocs(e) => e.friendly_message(),
            UsageError::Window { .. } => self.to_string(),
        }
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, UsageError>;
