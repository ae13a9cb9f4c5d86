//! End-to-end tests for the aggregation pipeline.
//!
//! These tests cover:
//! - Full account aggregation against a scripted OCS
//! - Weekly window fan-out and cost summing
//! - Template memoization and short-circuiting
//! - Window and subscriber failure policies
//! - Concurrency bounds
//! - The HTTP client wired through the pipeline (wiremock)

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};
use teltrip_core::{
    AppConfig, OcsConfig, PipelineConfig, SubscriberFailurePolicy, WindowFailurePolicy,
};
use teltrip_ocs::{MockOcs, OcsApi, OcsClient, OcsError, OcsRequest};
use teltrip_usage::{
    AccountTotals, FixedClock, SubscriberOutcome, UsageError, UsagePipeline,
};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Epoch 2025-06-01 and today 2025-06-15: windows 1-7, 8-14 and 15-15.
fn config() -> PipelineConfig {
    PipelineConfig::default()
        .with_default_account("3771")
        .with_epoch_start(date(2025, 6, 1))
}

fn pipeline_over(api: Arc<dyn OcsApi>, config: PipelineConfig, today: NaiveDate) -> UsagePipeline {
    UsagePipeline::new(api, config).with_clock(Arc::new(FixedClock(today)))
}

/// Answer every operation for an account of `subscribers` subscribers.
///
/// Subscriber `n` has ICCID `890n`, one package on template 11, and costs
/// 10.0 per usage window. Requests for which `fails` returns true get an
/// HTTP 500.
fn account_response(subscribers: i64, fails: fn(&OcsRequest) -> bool) -> MockOcs {
    MockOcs::new(move |request| {
        if fails(request) {
            return Err(OcsError::from_http_status(500, "boom"));
        }
        Ok(match request {
            OcsRequest::ListSubscriber { .. } => {
                let list: Vec<Value> = (1..=subscribers)
                    .map(|n| json!({"subscriberId": n, "imsiList": [{"iccid": format!("890{n}")}]}))
                    .collect();
                json!({"listSubscriber": {"subscriberList": list}})
            }
            OcsRequest::GetSingleSubscriber { iccid, .. } => json!({
                "getSingleSubscriber": {
                    "subscriberList": [{"lastUsageDate": format!("2025-06-14 ({iccid})")}]
                }
            }),
            OcsRequest::ListSubscriberPrepaidPackages { .. } => json!({
                "listSubscriberPrepaidPackages": {
                    "packages": [{
                        "templateId": 11,
                        "pckdatabyte": 1000,
                        "useddatabyte": 250,
                        "tsactivationutc": "2025-06-01 00:00:00",
                        "tsexpirationutc": "2025-07-01 00:00:00"
                    }]
                }
            }),
            OcsRequest::ListPrepaidPackageTemplate { .. } => json!({
                "listPrepaidPackageTemplate": {
                    "template": {"cost": 4.5, "prepaidpackagetemplatename": "EU 5GB"}
                }
            }),
            OcsRequest::SubscriberUsageOverPeriod { .. } => json!({
                "subscriberUsageOverPeriod": {"total": {"resellerCost": 10.0}}
            }),
        })
    })
}

fn never(_: &OcsRequest) -> bool {
    false
}

// ============================================================
// Happy path
// ============================================================

#[tokio::test]
async fn test_aggregates_every_subscriber_in_order() {
    let mock = Arc::new(account_response(2, never));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 15));

    let records = pipeline.aggregate(Some("3771")).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].subscriber_id, 1);
    assert_eq!(records[0].iccid, "8901");
    assert_eq!(records[1].subscriber_id, 2);
    assert_eq!(records[1].last_usage_date.as_deref(), Some("2025-06-14 (8902)"));

    for record in &records {
        assert_eq!(record.cost_since_epoch, 30.0);
        assert_eq!(record.packages.len(), 1);
        let package = &record.packages[0];
        assert_eq!(package.template_id, Some(11));
        assert_eq!(package.name.as_deref(), Some("EU 5GB"));
        assert_eq!(package.cost, Some(4.5));
        assert_eq!(package.allocated_bytes, Some(1000));
        assert_eq!(package.used_bytes, Some(250));
    }

    assert_eq!(mock.calls_for("listSubscriber"), 1);
    assert_eq!(mock.calls_for("getSingleSubscriber"), 2);
    assert_eq!(mock.calls_for("listSubscriberPrepaidPackages"), 2);
    assert_eq!(mock.calls_for("subscriberUsageOverPeriod"), 6);
}

#[tokio::test]
async fn test_windows_sent_upstream_cover_epoch_to_today() {
    let mock = Arc::new(account_response(1, never));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 15));
    pipeline.aggregate_all().await.unwrap();

    let mut periods: Vec<(NaiveDate, NaiveDate)> = mock
        .calls()
        .into_iter()
        .filter_map(|request| match request {
            OcsRequest::SubscriberUsageOverPeriod { subscriber, period } => {
                assert_eq!(subscriber.subscriber_id, 1);
                Some((period.start, period.end))
            }
            _ => None,
        })
        .collect();
    periods.sort();

    assert_eq!(
        periods,
        vec![
            (date(2025, 6, 1), date(2025, 6, 7)),
            (date(2025, 6, 8), date(2025, 6, 14)),
            (date(2025, 6, 15), date(2025, 6, 15)),
        ]
    );
}

#[tokio::test]
async fn test_epoch_equal_to_today_is_one_window() {
    let mock = Arc::new(account_response(1, never));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 1));

    let records = pipeline.aggregate_all().await.unwrap();
    assert_eq!(records[0].cost_since_epoch, 10.0);
    assert_eq!(mock.calls_for("subscriberUsageOverPeriod"), 1);
}

#[tokio::test]
async fn test_today_before_epoch_costs_nothing() {
    let mock = Arc::new(account_response(1, never));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 5, 20));

    let records = pipeline.aggregate_all().await.unwrap();
    assert_eq!(records[0].cost_since_epoch, 0.0);
    assert_eq!(mock.calls_for("subscriberUsageOverPeriod"), 0);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let mock = Arc::new(account_response(3, never));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 15));

    let first = pipeline.aggregate_all().await.unwrap();
    let second = pipeline.aggregate_all().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_record_json_shape() {
    let mock = Arc::new(account_response(1, never));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 1));
    let records = pipeline.aggregate_all().await.unwrap();

    let value = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(
        value,
        json!({
            "subscriberId": 1,
            "iccid": "8901",
            "lastUsageDate": "2025-06-14 (8901)",
            "packages": [{
                "templateId": 11,
                "prepaidpackagetemplatename": "EU 5GB",
                "cost": 4.5,
                "pckdatabyte": 1000,
                "useddatabyte": 250,
                "tsactivationutc": "2025-06-01 00:00:00",
                "tsexpirationutc": "2025-07-01 00:00:00"
            }],
            "costSinceEpoch": 10.0
        })
    );
}

#[tokio::test]
async fn test_totals_over_records() {
    let mock = Arc::new(account_response(2, never));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 15));
    let records = pipeline.aggregate_all().await.unwrap();

    let totals = AccountTotals::from_records(&records);
    assert_eq!(totals.subscriber_count, 2);
    assert_eq!(totals.package_count, 2);
    assert_eq!(totals.total_reseller_cost, 60.0);
    assert_eq!(totals.total_package_cost, 9.0);
    assert_eq!(totals.margin, -51.0);
}

// ============================================================
// Templates
// ============================================================

#[tokio::test]
async fn test_shared_template_fetched_once_per_run() {
    let mock = Arc::new(account_response(4, never).with_delay(Duration::from_millis(2)));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 1));

    pipeline.aggregate_all().await.unwrap();
    assert_eq!(mock.calls_for("listPrepaidPackageTemplate"), 1);

    pipeline.aggregate_all().await.unwrap();
    assert_eq!(mock.calls_for("listPrepaidPackageTemplate"), 2);
}

#[tokio::test]
async fn test_package_without_template_skips_lookup() {
    let mock = Arc::new(MockOcs::new(|request| {
        Ok(match request {
            OcsRequest::ListSubscriber { .. } => json!({
                "listSubscriber": {"subscriberList": [{"subscriberId": 9, "imsiList": [{"iccid": "8909"}]}]}
            }),
            OcsRequest::ListSubscriberPrepaidPackages { .. } => json!({
                "listSubscriberPrepaidPackages": {
                    "packages": [{"packageTemplate": {"prepaidpackagetemplatename": "Raw name"}}]
                }
            }),
            _ => json!({}),
        })
    }));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 1));

    let records = pipeline.aggregate_all().await.unwrap();
    let package = &records[0].packages[0];
    assert_eq!(package.template_id, None);
    assert_eq!(package.name.as_deref(), Some("Raw name"));
    assert_eq!(package.cost, None);
    assert_eq!(records[0].last_usage_date, None);
    assert_eq!(mock.calls_for("listPrepaidPackageTemplate"), 0);
}

// ============================================================
// Failure policies
// ============================================================

fn second_window_fails(request: &OcsRequest) -> bool {
    matches!(
        request,
        OcsRequest::SubscriberUsageOverPeriod { period, .. } if period.start == date(2025, 6, 8)
    )
}

#[tokio::test]
async fn test_failed_window_counts_as_zero_by_default() {
    let mock = Arc::new(account_response(2, second_window_fails));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 15));

    let records = pipeline.aggregate_all().await.unwrap();
    assert!(records.iter().all(|r| r.cost_since_epoch == 20.0));
}

#[tokio::test]
async fn test_fail_fast_window_policy_fails_the_subscriber() {
    let mock = Arc::new(account_response(2, second_window_fails));
    let config = config().with_window_failure_policy(WindowFailurePolicy::FailFast);
    let pipeline = pipeline_over(mock, config, date(2025, 6, 15));

    match pipeline.aggregate_all().await.unwrap_err() {
        UsageError::Window { subscriber_id, start, .. } => {
            assert_eq!(subscriber_id, 1);
            assert_eq!(start, date(2025, 6, 8));
        }
        other => panic!("Expected Window error, got: {:?}", other),
    }
}

fn second_subscriber_packages_fail(request: &OcsRequest) -> bool {
    matches!(request, OcsRequest::ListSubscriberPrepaidPackages { subscriber_id: 2 })
}

#[tokio::test]
async fn test_subscriber_failure_aborts_by_default() {
    let mock = Arc::new(account_response(3, second_subscriber_packages_fail));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 15));

    let err = pipeline.aggregate_all().await.unwrap_err();
    assert!(matches!(err, UsageError::Ocs(OcsError::UpstreamHttp { status: 500, .. })));
}

#[tokio::test]
async fn test_omit_policy_drops_failed_subscribers() {
    let mock = Arc::new(account_response(3, second_subscriber_packages_fail));
    let config = config().with_subscriber_failure_policy(SubscriberFailurePolicy::Omit);
    let pipeline = pipeline_over(mock, config, date(2025, 6, 15));

    let records = pipeline.aggregate_all().await.unwrap();
    let ids: Vec<i64> = records.iter().map(|r| r.subscriber_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_outcomes_report_each_subscriber() {
    let mock = Arc::new(account_response(3, second_subscriber_packages_fail));
    let pipeline = pipeline_over(mock, config(), date(2025, 6, 15));

    let outcomes = pipeline.aggregate_outcomes(None).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_ok());
    assert!(outcomes[2].is_ok());

    match &outcomes[1] {
        SubscriberOutcome::Failed { subscriber_id, iccid, reason } => {
            assert_eq!(*subscriber_id, 2);
            assert_eq!(iccid, "8902");
            assert!(reason.contains("OCS HTTP 500"), "reason was {reason}");
        }
        other => panic!("Expected failed outcome, got: {:?}", other),
    }

    let value = serde_json::to_value(&outcomes[1]).unwrap();
    assert_eq!(value["status"], "failed");
    assert_eq!(value["subscriberId"], 2);
}

#[tokio::test]
async fn test_enumeration_failure_fails_the_run() {
    let mock = Arc::new(account_response(2, |request| {
        matches!(request, OcsRequest::ListSubscriber { .. })
    }));
    let pipeline = pipeline_over(mock.clone(), config(), date(2025, 6, 15));

    assert!(pipeline.aggregate_outcomes(None).await.is_err());
    assert_eq!(mock.call_count(), 1);
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test]
async fn test_in_flight_requests_respect_limit() {
    let mock = Arc::new(account_response(6, never).with_delay(Duration::from_millis(5)));
    let pipeline = pipeline_over(mock.clone(), config().with_max_concurrency(3), date(2025, 6, 30));

    let records = pipeline.aggregate_all().await.unwrap();
    assert_eq!(records.len(), 6);
    assert!(mock.max_in_flight() <= 3, "max in flight was {}", mock.max_in_flight());
    assert!(mock.max_in_flight() > 1);
}

// ============================================================
// Setup errors
// ============================================================

#[tokio::test]
async fn test_missing_account_is_validation_error() {
    let mock = Arc::new(account_response(1, never));
    let pipeline = pipeline_over(mock.clone(), PipelineConfig::default(), date(2025, 6, 15));

    let err = pipeline.aggregate(Some("")).await.unwrap_err();
    assert!(matches!(err, UsageError::Validation(_)));
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_missing_token_is_config_error() {
    let config = AppConfig {
        ocs: OcsConfig {
            base_url: Some("https://ocs.example.test/api".into()),
            token: Some("   ".into()),
            ..Default::default()
        },
        ..Default::default()
    };

    let err = UsagePipeline::from_config(&config).err().unwrap();
    assert!(matches!(err, UsageError::Ocs(OcsError::Config(_))));
}

// ============================================================
// HTTP
// ============================================================

async fn http_pipeline(server: &MockServer) -> anyhow::Result<UsagePipeline> {
    let client = OcsClient::from_config(&OcsConfig {
        base_url: Some(format!("{}/ocs", server.uri())),
        token: Some("secret".into()),
        ..Default::default()
    })?;
    Ok(pipeline_over(Arc::new(client), config(), date(2025, 6, 1)))
}

#[tokio::test]
async fn test_http_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    let responses = [
        (
            "\"listSubscriber\"",
            json!({"listSubscriber": {"subscriberList": [{"subscriberId": 5, "imsiList": [{"iccid": "8905"}]}]}}),
        ),
        (
            "\"getSingleSubscriber\"",
            json!({"getSingleSubscriber": {"subscriberList": [{"lastUsageDate": "2025-06-01 09:00:00"}]}}),
        ),
        (
            "\"listSubscriberPrepaidPackages\"",
            json!({"listSubscriberPrepaidPackages": {"packages": [{"templateId": "7"}]}}),
        ),
        (
            "\"listPrepaidPackageTemplate\"",
            json!({"listPrepaidPackageTemplate": {"template": [{"cost": "2.25", "userUiName": "Roam 1GB"}]}}),
        ),
        (
            "\"subscriberUsageOverPeriod\"",
            json!({"subscriberUsageOverPeriod": {"total": {"resellerCost": "1.2345678"}}}),
        ),
    ];

    for (operation, body) in responses {
        Mock::given(method("POST"))
            .and(path("/ocs"))
            .and(query_param("token", "secret"))
            .and(body_string_contains(operation))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let records = http_pipeline(&server).await?.aggregate_all().await?;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.subscriber_id, 5);
    assert_eq!(record.last_usage_date.as_deref(), Some("2025-06-01 09:00:00"));
    assert_eq!(record.cost_since_epoch, 1.234568);
    assert_eq!(record.packages[0].template_id, Some(7));
    assert_eq!(record.packages[0].name.as_deref(), Some("Roam 1GB"));
    assert_eq!(record.packages[0].cost, Some(2.25));
    Ok(())
}

#[tokio::test]
async fn test_http_error_surfaces_status_and_body() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ocs"))
        .and(body_string_contains("\"listSubscriber\""))
        .respond_with(ResponseTemplate::new(500).set_body_string("account service unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = http_pipeline(&server).await?.aggregate_all().await.unwrap_err();

    match err {
        UsageError::Ocs(OcsError::UpstreamHttp { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "account service unavailable");
        }
        other => panic!("Expected UpstreamHttp error, got: {:?}", other),
    }
    Ok(())
}
