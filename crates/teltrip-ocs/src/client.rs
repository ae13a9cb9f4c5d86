//! HTTP client for the OCS charging API.
//!
//! [`OcsClient`] performs exactly one POST per [`OcsRequest`]: the token goes
//! into the query string, the request envelope into the JSON body. Non-2xx
//! responses become [`OcsError::UpstreamHttp`] with the raw body attached.
//! There are no retries at this layer.
//!
//! ## Example
//!
//! ```no_run
//! use teltrip_core::OcsConfig;
//! use teltrip_ocs::{OcsApi, OcsClient, OcsRequest};
//!
//! # async fn example() -> teltrip_ocs::Result<()> {
//! let config = OcsConfig {
//!     base_url: Some("https://ocs-api.example.cloud/v1".into()),
//!     token: Some("secret".into()),
//!     ..Default::default()
//! };
//! let client = OcsClient::from_config(&config)?;
//! let body = client.execute(&OcsRequest::list_subscriber(3771)).await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use ::async_trait::async_trait;
use serde_json::Value;
use teltrip_core::{OcsConfig, log_upstream_call};
use tracing::warn;

use crate::error::{OcsError, Result};
use crate::types::OcsRequest;

/// A single-operation request/response channel to the OCS.
///
/// The pipeline depends on this trait rather than on [`OcsClient`] so that
/// wrappers ([`crate::LimitedOcs`]) and test doubles ([`crate::MockOcs`])
/// can be slotted in.
#[async_trait]
pub trait OcsApi: Send + Sync {
    /// Execute one operation and return the parsed response body unmodified.
    async fn execute(&self, request: &OcsRequest) -> Result<Value>;
}

#[async_trait]
impl<T: OcsApi + ?Sized> OcsApi for Arc<T> {
    async fn execute(&self, request: &OcsRequest) -> Result<Value> {
        (**self).execute(request).await
    }
}

/// reqwest-backed OCS client.
#[derive(Clone)]
pub struct OcsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for OcsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcsClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl OcsClient {
    /// Create a client from config.
    ///
    /// Fails with [`OcsError::Config`] when the base URL or token is missing
    /// or blank. No request is made here.
    pub fn from_config(config: &OcsConfig) -> Result<Self> {
        let base_url = non_blank(config.base_url.as_deref())
            .ok_or_else(|| OcsError::Config("missing OCS base URL".to_string()))?;
        let token = non_blank(config.token.as_deref())
            .ok_or_else(|| OcsError::Config("missing OCS token".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token: token.to_string(),
        })
    }

    /// The configured endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl OcsApi for OcsClient {
    async fn execute(&self, request: &OcsRequest) -> Result<Value> {
        let operation = request.operation();
        let start = Instant::now();

        let response = self
            .client
            .post(&self.base_url)
            .query(&[("token", self.token.as_str())])
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            warn!(operation, status = status.as_u16(), elapsed_ms, "OCS request failed");
            return Err(OcsError::from_http_status(status.as_u16(), body));
        }

        log_upstream_call!(operation, status = status.as_u16(), elapsed_ms);
        Ok(serde_json::from_str(&body)?)
    }
}
