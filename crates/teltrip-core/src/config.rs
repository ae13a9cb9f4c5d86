//! Configuration for the OCS client and the aggregation pipeline.
//!
//! Configuration is read from `~/.teltrip/config.yaml` (or an explicit path)
//! and then overlaid with the `OCS_BASE_URL`, `OCS_TOKEN` and
//! `OCS_ACCOUNT_ID` environment variables. The resulting [`AppConfig`] is
//! passed explicitly into the client and pipeline constructors; nothing
//! below the binary reads process state.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Environment variable overriding [`OcsConfig::base_url`].
pub const ENV_BASE_URL: &str = "OCS_BASE_URL";
/// Environment variable overriding [`OcsConfig::token`].
pub const ENV_TOKEN: &str = "OCS_TOKEN";
/// Environment variable overriding [`PipelineConfig::default_account_id`].
pub const ENV_ACCOUNT_ID: &str = "OCS_ACCOUNT_ID";

/// Longest period the OCS accepts in a single usage query.
pub const MAX_WINDOW_SPAN_DAYS: u32 = 7;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream charging system connection
    pub ocs: OcsConfig,

    /// Aggregation pipeline behavior
    pub pipeline: PipelineConfig,
}

/// Connection settings for the OCS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcsConfig {
    /// Endpoint URL, e.g. `https://ocs-api.example.cloud/v1`
    pub base_url: Option<String>,

    /// Access token, sent as the `token` query parameter
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OcsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

/// What to do when a single weekly usage query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFailurePolicy {
    /// Count the failed window as zero cost and keep going
    #[default]
    SwallowAsZero,
    /// Return the first window failure as the subscriber's error
    FailFast,
}

/// What `aggregate` does when one subscriber's facts cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberFailurePolicy {
    /// Fail the whole aggregation with the first subscriber error
    #[default]
    Abort,
    /// Drop the failed subscriber from the result list
    Omit,
}

/// Aggregation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Account used when the caller does not name one
    pub default_account_id: Option<String>,

    /// First day (inclusive, UTC) of the cumulative cost sum
    pub epoch_start: NaiveDate,

    /// Length of each usage query window in days (1..=7)
    pub window_span_days: u32,

    /// Maximum number of in-flight upstream requests
    pub max_concurrency: usize,

    /// Policy for failed weekly usage queries
    pub window_failure_policy: WindowFailurePolicy,

    /// Policy for subscribers whose facts cannot be fetched
    pub subscriber_failure_policy: SubscriberFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_account_id: None,
            epoch_start: default_epoch_start(),
            window_span_days: MAX_WINDOW_SPAN_DAYS,
            max_concurrency: 16,
            window_failure_policy: WindowFailurePolicy::default(),
            subscriber_failure_policy: SubscriberFailurePolicy::default(),
        }
    }
}

/// 2025-06-01, the start of cost tracking.
pub fn default_epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or(NaiveDate::MIN)
}

impl PipelineConfig {
    /// Set the default account id.
    pub fn with_default_account(mut self, account_id: impl Into<String>) -> Self {
        self.default_account_id = Some(account_id.into());
        self
    }

    /// Set the epoch start date.
    pub fn with_epoch_start(mut self, epoch_start: NaiveDate) -> Self {
        self.epoch_start = epoch_start;
        self
    }

    /// Set the concurrency ceiling.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the window failure policy.
    pub fn with_window_failure_policy(mut self, policy: WindowFailurePolicy) -> Self {
        self.window_failure_policy = policy;
        self
    }

    /// Set the subscriber failure policy.
    pub fn with_subscriber_failure_policy(mut self, policy: SubscriberFailurePolicy) -> Self {
        self.subscriber_failure_policy = policy;
        self
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// built-in defaults. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read and validate a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::config_not_found_with_source(path, e))?;
        Self::from_yaml_str(&content, path)
    }

    /// Parse and validate YAML content. `origin` is only used in errors.
    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)
            .map_err(|e| CoreError::config_invalid(origin, e.to_string()))?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Overlay values from a key lookup (normally the process environment).
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.ocs.base_url = Some(url);
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.ocs.token = Some(token);
        }
        if let Some(account) = non_empty(ENV_ACCOUNT_ID) {
            self.pipeline.default_account_id = Some(account);
        }
    }

    /// Check value ranges.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let span = self.pipeline.window_span_days;
        if span == 0 || span > MAX_WINDOW_SPAN_DAYS {
            return Err(CoreError::config_invalid(
                origin,
                format!(
                    "pipeline.window_span_days must be between 1 and {}, got {}",
                    MAX_WINDOW_SPAN_DAYS, span
                ),
            ));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(CoreError::config_invalid(
                origin,
                "pipeline.max_concurrency must be at least 1",
            ));
        }
        if self.ocs.timeout_secs == 0 {
            return Err(CoreError::config_invalid(
                origin,
                "ocs.timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Get the teltrip home directory.
///
/// Returns `~/.teltrip/`
pub fn teltrip_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CoreError::internal("home directory not found"))?;
    Ok(home.join(".teltrip"))
}

/// Get the default config file path.
///
/// Returns `~/.teltrip/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(teltrip_dir()?.join("config.yaml"))
}
