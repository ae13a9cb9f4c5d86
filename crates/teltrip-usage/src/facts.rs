//! Per-subscriber status and package lookups.
//!
//! Both calls are read-only and independent; the pipeline runs them
//! concurrently for every subscriber.

use teltrip_ocs::{
    OcsApi, OcsRequest, PackageListPayload, RawPrepaidPackage, SubscriberListPayload,
    extract_payload,
};

use crate::error::Result;
use crate::models::{BasicInfo, RawPackage};

/// Key some OCS deployments answer `getSingleSubscriber` under.
const LIST_SUBSCRIBER_KEY: &str = "listSubscriber";

/// Look up a subscriber by ICCID and report its last usage date.
pub async fn get_basic_info(api: &dyn OcsApi, iccid: &str) -> Result<BasicInfo> {
    let request = OcsRequest::get_single_subscriber(iccid);
    let body = api.execute(&request).await?;

    let payload = match extract_payload::<SubscriberListPayload>(&body, request.operation())? {
        Some(payload) => Some(payload),
        None => extract_payload::<SubscriberListPayload>(&body, LIST_SUBSCRIBER_KEY)?,
    };

    let last_usage_date = payload
        .and_then(|p| p.subscriber_list.into_iter().next())
        .and_then(|s| s.last_usage_date);

    Ok(BasicInfo {
        iccid: iccid.to_string(),
        last_usage_date,
    })
}

/// List every prepaid package assigned to a subscriber.
pub async fn list_packages(api: &dyn OcsApi, subscriber_id: i64) -> Result<Vec<RawPackage>> {
    let request = OcsRequest::list_subscriber_prepaid_packages(subscriber_id);
    let body = api.execute(&request).await?;

    let payload: Option<PackageListPayload> = extract_payload(&body, request.operation())?;
    Ok(payload
        .map(|p| p.packages)
        .unwrap_or_default()
        .into_iter()
        .map(raw_package)
        .collect())
}

fn raw_package(package: RawPrepaidPackage) -> RawPackage {
    let template = package.package_template.unwrap_or_default();
    RawPackage {
        template_id: package.template_id.or(template.prepaidpackagetemplateid),
        raw_name: template.prepaidpackagetemplatename,
        pckdatabyte: package.pckdatabyte,
        useddatabyte: package.useddatabyte,
        tsactivationutc: package.tsactivationutc,
        tsexpirationutc: package.tsexpirationutc,
    }
}
