//! Data models for aggregated subscriber usage.
//!
//! All of these are transient: they are rebuilt from upstream data on every
//! aggregation call and never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A subscriber that has both identifiers needed for the follow-up queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub subscriber_id: i64,
    pub iccid: String,
}

/// Status facts from `getSingleSubscriber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub iccid: String,
    pub last_usage_date: Option<String>,
}

/// A prepaid package as listed for a subscriber, before template resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPackage {
    pub template_id: Option<i64>,
    pub raw_name: Option<String>,
    pub pckdatabyte: Option<i64>,
    pub useddatabyte: Option<i64>,
    pub tsactivationutc: Option<String>,
    pub tsexpirationutc: Option<String>,
}

/// Canonical name and unit cost of a package template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateInfo {
    pub name: Option<String>,
    pub cost: Option<f64>,
}

/// A prepaid package enriched with its template's name and cost.
///
/// Serialized with the OCS field names the dashboard columns use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "templateId")]
    pub template_id: Option<i64>,

    #[serde(rename = "prepaidpackagetemplatename")]
    pub name: Option<String>,

    /// Template unit cost; `None` when the template could not be resolved
    pub cost: Option<f64>,

    #[serde(rename = "pckdatabyte")]
    pub allocated_bytes: Option<i64>,

    #[serde(rename = "useddatabyte")]
    pub used_bytes: Option<i64>,

    /// Activation time as reported by the OCS (UTC)
    #[serde(rename = "tsactivationutc")]
    pub activated_at: Option<String>,

    /// Expiration time as reported by the OCS (UTC)
    #[serde(rename = "tsexpirationutc")]
    pub expires_at: Option<String>,
}

impl Package {
    /// Combine a raw package with its template; template values win.
    pub fn from_parts(raw: RawPackage, template: TemplateInfo) -> Self {
        Self {
            template_id: raw.template_id,
            name: template.name.or(raw.raw_name),
            cost: template.cost,
            allocated_bytes: raw.pckdatabyte,
            used_bytes: raw.useddatabyte,
            activated_at: raw.tsactivationutc,
            expires_at: raw.tsexpirationutc,
        }
    }
}

/// Inclusive date range for one usage query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsageWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl UsageWindow {
    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One row of the aggregated result: everything known about a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRecord {
    pub subscriber_id: i64,
    pub iccid: String,
    pub last_usage_date: Option<String>,
    pub packages: Vec<Package>,
    /// Reseller cost summed over all windows since the epoch, 6 decimals
    pub cost_since_epoch: f64,
}

/// Per-subscriber result of an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriberOutcome {
    Ok(AggregatedRecord),
    #[serde(rename_all = "camelCase")]
    Failed {
        subscriber_id: i64,
        iccid: String,
        reason: String,
    },
}

impl SubscriberOutcome {
    pub fn subscriber_id(&self) -> i64 {
        match self {
            SubscriberOutcome::Ok(record) => record.subscriber_id,
            SubscriberOutcome::Failed { subscriber_id, .. } => *subscriber_id,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SubscriberOutcome::Ok(_))
    }

    /// The record, if the subscriber succeeded.
    pub fn record(&self) -> Option<&AggregatedRecord> {
        match self {
            SubscriberOutcome::Ok(record) => Some(record),
            SubscriberOutcome::Failed { .. } => None,
        }
    }
}

/// Account-level totals over a list of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotals {
    pub subscriber_count: usize,
    pub package_count: usize,
    /// Sum of `cost_since_epoch`
    pub total_reseller_cost: f64,
    /// Sum of resolved package template costs
    pub total_package_cost: f64,
    /// `total_package_cost - total_reseller_cost`
    pub margin: f64,
}

impl AccountTotals {
    pub fn from_records(records: &[AggregatedRecord]) -> Self {
        let total_reseller_cost: f64 = records.iter().map(|r| r.cost_since_epoch).sum();
        let total_package_cost: f64 = records
            .iter()
            .flat_map(|r| r.packages.iter())
            .filter_map(|p| p.cost)
            .sum();

        Self {
            subscriber_count: records.len(),
            package_count: records.iter().map(|r| r.packages.len()).sum(),
            total_reseller_cost: round_cost(total_reseller_cost),
            total_package_cost: round_cost(total_package_cost),
            margin: round_cost(total_package_cost - total_reseller_cost),
        }
    }
}

/// Round a cost to 6 decimal digits.
pub fn round_cost(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 1_000_000.0).round() / 1_000_000.0
}
