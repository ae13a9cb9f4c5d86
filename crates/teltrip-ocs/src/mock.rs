//! In-memory [`OcsApi`] for tests.
//!
//! [`MockOcs`] answers every request through a handler closure and records
//! what it was asked, how often, and how many calls overlapped.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ::async_trait::async_trait;
use serde_json::Value;

use crate::client::OcsApi;
use crate::error::Result;
use crate::types::OcsRequest;

type Handler = dyn Fn(&OcsRequest) -> Result<Value> + Send + Sync;

/// Scripted OCS double.
pub struct MockOcs {
    handler: Box<Handler>,
    delay: Option<Duration>,
    calls: Mutex<Vec<OcsRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockOcs {
    /// Create a mock that answers with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&OcsRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received, in arrival order.
    pub fn calls(&self) -> Vec<OcsRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Total number of requests received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of requests received for one operation key.
    pub fn calls_for(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|r| r.operation() == operation).count())
            .unwrap_or(0)
    }

    /// Highest number of calls observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcsApi for MockOcs {
    async fn execute(&self, request: &OcsRequest) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
