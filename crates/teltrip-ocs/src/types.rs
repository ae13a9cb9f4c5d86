//! OCS request envelopes and response payload types.
//!
//! Every request body is a JSON object with exactly one key naming the
//! operation; the response mirrors that key. Response payloads are decoded
//! leniently: every field is optional, `null` collections decode as empty,
//! numeric fields accept both JSON numbers and numeric strings, and text
//! fields accept numbers (anything else decodes as absent).

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{OcsError, Result};

/// A single OCS operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OcsRequest {
    /// Subscribers belonging to an account
    ListSubscriber { account_id: i64 },

    /// One subscriber looked up by ICCID
    GetSingleSubscriber {
        iccid: String,
        with_sim_info: bool,
        only_subs_info: bool,
    },

    /// Prepaid packages assigned to a subscriber
    ListSubscriberPrepaidPackages { subscriber_id: i64 },

    /// Prepaid package template definition
    ListPrepaidPackageTemplate { template_id: i64 },

    /// Accumulated usage and cost over a period of at most one week
    SubscriberUsageOverPeriod {
        subscriber: SubscriberRef,
        period: Period,
    },
}

/// Subscriber selector used by usage queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRef {
    pub subscriber_id: i64,
}

/// Inclusive date range, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OcsRequest {
    pub fn list_subscriber(account_id: i64) -> Self {
        OcsRequest::ListSubscriber { account_id }
    }

    pub fn get_single_subscriber(iccid: impl Into<String>) -> Self {
        OcsRequest::GetSingleSubscriber {
            iccid: iccid.into(),
            with_sim_info: true,
            only_subs_info: true,
        }
    }

    pub fn list_subscriber_prepaid_packages(subscriber_id: i64) -> Self {
        OcsRequest::ListSubscriberPrepaidPackages { subscriber_id }
    }

    pub fn list_prepaid_package_template(template_id: i64) -> Self {
        OcsRequest::ListPrepaidPackageTemplate { template_id }
    }

    pub fn subscriber_usage_over_period(subscriber_id: i64, start: NaiveDate, end: NaiveDate) -> Self {
        OcsRequest::SubscriberUsageOverPeriod {
            subscriber: SubscriberRef { subscriber_id },
            period: Period { start, end },
        }
    }

    /// The top-level key of the request (and response) envelope.
    pub fn operation(&self) -> &'static str {
        match self {
            OcsRequest::ListSubscriber { .. } => "listSubscriber",
            OcsRequest::GetSingleSubscriber { .. } => "getSingleSubscriber",
            OcsRequest::ListSubscriberPrepaidPackages { .. } => "listSubscriberPrepaidPackages",
            OcsRequest::ListPrepaidPackageTemplate { .. } => "listPrepaidPackageTemplate",
            OcsRequest::SubscriberUsageOverPeriod { .. } => "subscriberUsageOverPeriod",
        }
    }
}

/// Decode the payload stored under `key` in a response body.
///
/// Returns `Ok(None)` when the key is absent or `null`, and
/// [`OcsError::MissingPayload`] when the body is not an envelope object.
pub fn extract_payload<T: DeserializeOwned>(body: &Value, key: &str) -> Result<Option<T>> {
    let Some(envelope) = body.as_object() else {
        return Err(OcsError::MissingPayload(key.to_string()));
    };
    match envelope.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(payload) => Ok(Some(T::deserialize(payload)?)),
    }
}

// ============================================================================
// Response payloads
// ============================================================================

/// Payload of `listSubscriber` (and of `getSingleSubscriber`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberListPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscriber_list: Vec<RawSubscriber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubscriber {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub subscriber_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_usage_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub imsi_list: Vec<RawImsi>,
}

/// SIM record attached to a subscriber.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImsi {
    #[serde(default, deserialize_with = "lenient_string")]
    pub iccid: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub subscriber_id: Option<i64>,
}

/// Payload of `listSubscriberPrepaidPackages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageListPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub packages: Vec<RawPrepaidPackage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrepaidPackage {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub template_id: Option<i64>,
    #[serde(default)]
    pub package_template: Option<RawPackageTemplateRef>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub pckdatabyte: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub useddatabyte: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tsactivationutc: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tsexpirationutc: Option<String>,
}

/// Template summary embedded in a package record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPackageTemplateRef {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub prepaidpackagetemplateid: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prepaidpackagetemplatename: Option<String>,
}

/// Payload of `listPrepaidPackageTemplate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePayload {
    #[serde(default)]
    pub template: Option<OneOrMany<RawTemplate>>,
}

/// Either a bare object or a sequence of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// The single object, or the first element of the sequence.
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.into_iter().next(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTemplate {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prepaidpackagetemplatename: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_ui_name: Option<String>,
}

impl RawTemplate {
    /// Canonical name, falling back to the UI name.
    pub fn name(&self) -> Option<&str> {
        self.prepaidpackagetemplatename
            .as_deref()
            .or(self.user_ui_name.as_deref())
    }
}

/// Payload of `subscriberUsageOverPeriod`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsagePayload {
    #[serde(default)]
    pub total: Option<UsageTotal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotal {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reseller_cost: Option<f64>,
}

// ============================================================================
// Lenient field decoders
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f: &f64| f.is_finite()))
}
