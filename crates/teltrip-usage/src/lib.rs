//! # teltrip-usage
//!
//! Per-subscriber usage and cost aggregation over the OCS.
//!
//! This crate provides:
//! - [`UsagePipeline`] - Orchestrates one aggregation run for an account
//! - [`enumerator`] - Subscriber listing and account id parsing
//! - [`facts`] - Per-subscriber status and package lookups
//! - [`TemplateResolver`] - Memoized package template resolution
//! - [`WeeklyUsageAggregator`] - Cumulative cost over weekly windows
//! - [`models`] - Aggregated records, outcomes and account totals
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use teltrip_core::PipelineConfig;
//! use teltrip_ocs::MockOcs;
//! use teltrip_usage::UsagePipeline;
//!
//! # async fn example() -> teltrip_usage::Result<()> {
//! let api = Arc::new(MockOcs::new(|_| Ok(serde_json::json!({}))));
//! let pipeline = UsagePipeline::new(api, PipelineConfig::default());
//! let records = pipeline.aggregate(Some("3771")).await?;
//! assert!(records.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod enumerator;
pub mod error;
pub mod facts;
pub mod models;
pub mod pipeline;
pub mod templates;
pub mod weekly;

pub use clock::{Clock, FixedClock, SystemClock};
pub use enumerator::{list_subscribers, parse_account_id};
pub use error::{Result, UsageError};
pub use facts::{get_basic_info, list_packages};
pub use models::{
    AccountTotals, AggregatedRecord, BasicInfo, Package, RawPackage, Subscriber,
    SubscriberOutcome, TemplateInfo, UsageWindow, round_cost,
};
pub use pipeline::UsagePipeline;
pub use templates::TemplateResolver;
pub use weekly::{WEEK_DAYS, WeeklyUsageAggregator, weekly_windows, windows_with_span};
