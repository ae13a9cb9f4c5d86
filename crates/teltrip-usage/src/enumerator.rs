//! Subscriber enumeration for an account.

use teltrip_ocs::{OcsApi, OcsRequest, RawSubscriber, SubscriberListPayload, extract_payload};
use tracing::debug;

use crate::error::{Result, UsageError};
use crate::models::Subscriber;

/// Parse an externally supplied account id into the numeric OCS id.
pub fn parse_account_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| UsageError::Validation(format!("account id must be an integer, got {:?}", raw)))
}

/// List the subscribers of `account_id` that have both an id and an ICCID.
///
/// The ICCID comes from the subscriber's first SIM record; the id falls back
/// to that SIM record's subscriber id. An account without subscribers yields
/// an empty list.
pub async fn list_subscribers(api: &dyn OcsApi, account_id: i64) -> Result<Vec<Subscriber>> {
    let request = OcsRequest::list_subscriber(account_id);
    let body = api.execute(&request).await?;

    let payload: Option<SubscriberListPayload> = extract_payload(&body, request.operation())?;
    let entries = payload.map(|p| p.subscriber_list).unwrap_or_default();
    let total = entries.len();

    let subscribers: Vec<Subscriber> = entries.into_iter().filter_map(usable_subscriber).collect();

    debug!(
        account_id,
        listed = total,
        usable = subscribers.len(),
        "enumerated subscribers"
    );
    Ok(subscribers)
}

fn usable_subscriber(entry: RawSubscriber) -> Option<Subscriber> {
    let first_sim = entry.imsi_list.into_iter().next();

    let subscriber_id = entry
        .subscriber_id
        .or_else(|| first_sim.as_ref().and_then(|sim| sim.subscriber_id))
        .filter(|id| *id != 0)?;

    let iccid = first_sim
        .and_then(|sim| sim.iccid)
        .map(|iccid| iccid.trim().to_string())
        .filter(|iccid| !iccid.is_empty())?;

    Some(Subscriber {
        subscriber_id,
        iccid,
    })
}
