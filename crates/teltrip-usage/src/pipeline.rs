//! Aggregation orchestrator.
//!
//! [`UsagePipeline`] is the entry point: it enumerates an account's
//! subscribers once, then for every subscriber concurrently fetches status,
//! packages and weekly cost, resolves package templates, and returns one
//! [`AggregatedRecord`] per subscriber in enumeration order.
//!
//! All work runs as futures on the calling task; nothing is spawned. Every
//! upstream request goes through a [`LimitedOcs`] sized by
//! [`PipelineConfig::max_concurrency`].
//!
//! ## Example
//!
//! ```no_run
//! use teltrip_core::AppConfig;
//! use teltrip_usage::UsagePipeline;
//!
//! # async fn example() -> teltrip_usage::Result<()> {
//! let config = AppConfig::load(None).expect("config");
//! let pipeline = UsagePipeline::from_config(&config)?;
//! let records = pipeline.aggregate(Some("3771")).await?;
//! println!("{} subscribers", records.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::{join_all, try_join_all};
use teltrip_core::{AppConfig, PipelineConfig, SubscriberFailurePolicy};
use teltrip_ocs::{LimitedOcs, OcsApi, OcsClient};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::enumerator::{list_subscribers, parse_account_id};
use crate::error::{Result, UsageError};
use crate::facts::{get_basic_info, list_packages};
use crate::models::{AggregatedRecord, Subscriber, SubscriberOutcome};
use crate::templates::TemplateResolver;
use crate::weekly::{WeeklyUsageAggregator, windows_with_span};

/// Composes enumeration, fact fetching, template enrichment and weekly cost
/// aggregation for an account.
pub struct UsagePipeline {
    api: Arc<dyn OcsApi>,
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
}

impl UsagePipeline {
    /// Create a pipeline over `api`, bounded by `config.max_concurrency`.
    pub fn new(api: Arc<dyn OcsApi>, config: PipelineConfig) -> Self {
        let limited: Arc<dyn OcsApi> = Arc::new(LimitedOcs::new(api, config.max_concurrency));
        Self {
            api: limited,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build an HTTP-backed pipeline from application config.
    ///
    /// Fails with a configuration error if the OCS endpoint or token is
    /// missing; no request is made.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = OcsClient::from_config(&config.ocs)?;
        Ok(Self::new(Arc::new(client), config.pipeline.clone()))
    }

    /// Replace the clock used to determine "today".
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate every subscriber of `account_id` (or the configured default).
    ///
    /// Subscriber failures are handled per [`SubscriberFailurePolicy`]:
    /// `Abort` returns the first failure in enumeration order, `Omit` drops
    /// failed subscribers from the list.
    pub async fn aggregate(&self, account_id: Option<&str>) -> Result<Vec<AggregatedRecord>> {
        let results = self.run(account_id).await?;
        let mut records = Vec::with_capacity(results.len());

        for (subscriber, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(error) => match self.config.subscriber_failure_policy {
                    SubscriberFailurePolicy::Abort => return Err(error),
                    SubscriberFailurePolicy::Omit => {
                        warn!(
                            subscriber_id = subscriber.subscriber_id,
                            iccid = %subscriber.iccid,
                            error = %error,
                            "omitting subscriber"
                        );
                    }
                },
            }
        }

        Ok(records)
    }

    /// [`aggregate`](Self::aggregate) for the configured default account.
    pub async fn aggregate_all(&self) -> Result<Vec<AggregatedRecord>> {
        self.aggregate(None).await
    }

    /// Aggregate with one tagged outcome per subscriber.
    ///
    /// Only account resolution and enumeration failures fail the call;
    /// per-subscriber failures come back as [`SubscriberOutcome::Failed`].
    pub async fn aggregate_outcomes(&self, account_id: Option<&str>) -> Result<Vec<SubscriberOutcome>> {
        let results = self.run(account_id).await?;
        Ok(results
            .into_iter()
            .map(|(subscriber, result)| match result {
                Ok(record) => SubscriberOutcome::Ok(record),
                Err(error) => SubscriberOutcome::Failed {
                    subscriber_id: subscriber.subscriber_id,
                    iccid: subscriber.iccid,
                    reason: error.to_string(),
                },
            })
            .collect())
    }

    /// Pick the account id: explicit argument first, then the default.
    pub fn resolve_account(&self, account_id: Option<&str>) -> Result<i64> {
        let explicit = account_id.map(str::trim).filter(|id| !id.is_empty());
        let fallback = self
            .config
            .default_account_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        match explicit.or(fallback) {
            Some(raw) => parse_account_id(raw),
            None => Err(UsageError::Validation(
                "no account id given and no default account configured (set OCS_ACCOUNT_ID)".to_string(),
            )),
        }
    }

    async fn run(&self, account_id: Option<&str>) -> Result<Vec<(Subscriber, Result<AggregatedRecord>)>> {
        let account_id = self.resolve_account(account_id)?;
        let started = Instant::now();
        let api = self.api.as_ref();

        let subscribers = list_subscribers(api, account_id).await?;

        let today = self.clock.today();
        let windows = windows_with_span(self.config.epoch_start, today, self.config.window_span_days);
        info!(
            account_id,
            subscribers = subscribers.len(),
            windows = windows.len(),
            epoch = %self.config.epoch_start,
            %today,
            "aggregating account usage"
        );

        let weekly = WeeklyUsageAggregator::new(api, windows, self.config.window_failure_policy);
        let templates = TemplateResolver::new(api);

        let results = join_all(
            subscribers
                .iter()
                .map(|subscriber| self.aggregate_subscriber(subscriber, &weekly, &templates)),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            account_id,
            subscribers = subscribers.len(),
            failed,
            template_lookups = templates.upstream_lookups(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation finished"
        );

        Ok(subscribers.into_iter().zip(results).collect())
    }

    async fn aggregate_subscriber(
        &self,
        subscriber: &Subscriber,
        weekly: &WeeklyUsageAggregator<'_>,
        templates: &TemplateResolver<'_>,
    ) -> Result<AggregatedRecord> {
        let api = self.api.as_ref();
        let subscriber_id = subscriber.subscriber_id;

        let (basic, packages, cost) = tokio::join!(
            get_basic_info(api, &subscriber.iccid),
            list_packages(api, subscriber_id),
            weekly.sum_cost(subscriber_id),
        );
        let (basic, packages, cost) = (basic?, packages?, cost?);

        let packages = try_join_all(packages.into_iter().map(|raw| templates.enrich(raw))).await?;

        debug!(
            subscriber_id,
            iccid = %subscriber.iccid,
            packages = packages.len(),
            cost,
            "subscriber aggregated"
        );

        Ok(AggregatedRecord {
            subscriber_id,
            iccid: subscriber.iccid.clone(),
            last_usage_date: basic.last_usage_date,
            packages,
            cost_since_epoch: cost,
        })
    }
}
