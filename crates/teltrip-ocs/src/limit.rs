//! Concurrency ceiling for upstream calls.
//!
//! The aggregation pipeline fans out one request per subscriber, package and
//! usage week. [`LimitedOcs`] caps how many of those are in flight at once.
//! A permit is held only for the duration of a single upstream round trip,
//! so callers may nest fan-outs freely without deadlocking.

use std::sync::Arc;

use ::async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::client::OcsApi;
use crate::error::{OcsError, Result};
use crate::types::OcsRequest;

/// Wraps an [`OcsApi`] with a semaphore-bounded request budget.
pub struct LimitedOcs<A> {
    inner: A,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl<A: OcsApi> LimitedOcs<A> {
    /// Allow at most `max_concurrency` concurrent calls (minimum 1).
    pub fn new(inner: A, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Configured ceiling.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Permits not currently held by an in-flight call.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// The wrapped client.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Stop admitting calls. Calls already holding a permit run to
    /// completion; waiting and later calls fail with
    /// [`OcsError::LimiterClosed`].
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

#[async_trait]
impl<A: OcsApi> OcsApi for LimitedOcs<A> {
    async fn execute(&self, request: &OcsRequest) -> Result<Value> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OcsError::LimiterClosed)?;
        trace!(
            operation = request.operation(),
            available = self.permits.available_permits(),
            "acquired upstream permit"
        );
        self.inner.execute(request).await
    }
}
