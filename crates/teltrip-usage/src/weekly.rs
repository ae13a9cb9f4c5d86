//! Cumulative reseller cost since the epoch, one usage query per week.
//!
//! The OCS rejects usage periods longer than one week, so the range
//! `[epoch, today]` is cut into consecutive windows and each window is
//! queried separately. What happens when a window query fails is decided by
//! the configured [`WindowFailurePolicy`]; by default the window counts as
//! zero and the sum carries on.

use chrono::{Days, NaiveDate};
use futures_util::future::{join_all, try_join_all};
use teltrip_core::{WindowFailurePolicy, log_cost_event};
use teltrip_ocs::{OcsApi, OcsError, OcsRequest, UsagePayload, extract_payload};
use tracing::warn;

use crate::error::{Result, UsageError};
use crate::models::{UsageWindow, round_cost};

/// Default window length: the longest span the OCS accepts.
pub const WEEK_DAYS: u32 = 7;

/// Weekly windows covering `[epoch, today]`.
pub fn weekly_windows(epoch: NaiveDate, today: NaiveDate) -> Vec<UsageWindow> {
    windows_with_span(epoch, today, WEEK_DAYS)
}

/// Consecutive `span_days`-long windows covering `[epoch, today]`.
///
/// Windows never overlap and leave no gaps; the last window ends exactly on
/// `today`. Empty when `today` is before `epoch`.
pub fn windows_with_span(epoch: NaiveDate, today: NaiveDate, span_days: u32) -> Vec<UsageWindow> {
    let span = u64::from(span_days.max(1));
    let mut windows = Vec::new();
    let mut start = epoch;

    while start <= today {
        let end = start
            .checked_add_days(Days::new(span - 1))
            .map_or(today, |end| end.min(today));
        windows.push(UsageWindow { start, end });

        match start.checked_add_days(Days::new(span)) {
            Some(next) => start = next,
            None => break,
        }
    }

    windows
}

/// Sums per-window reseller cost for subscribers over a fixed window list.
pub struct WeeklyUsageAggregator<'a> {
    api: &'a dyn OcsApi,
    windows: Vec<UsageWindow>,
    policy: WindowFailurePolicy,
}

impl<'a> WeeklyUsageAggregator<'a> {
    pub fn new(api: &'a dyn OcsApi, windows: Vec<UsageWindow>, policy: WindowFailurePolicy) -> Self {
        Self {
            api,
            windows,
            policy,
        }
    }

    pub fn windows(&self) -> &[UsageWindow] {
        &self.windows
    }

    pub fn policy(&self) -> WindowFailurePolicy {
        self.policy
    }

    /// Total reseller cost of `subscriber_id` across all windows, rounded to
    /// 6 decimals. All windows are queried concurrently.
    pub async fn sum_cost(&self, subscriber_id: i64) -> Result<f64> {
        let costs = match self.policy {
            WindowFailurePolicy::SwallowAsZero => {
                let results = join_all(
                    self.windows
                        .iter()
                        .map(|window| self.window_cost(subscriber_id, window)),
                )
                .await;

                self.windows
                    .iter()
                    .zip(results)
                    .map(|(window, result)| {
                        result.unwrap_or_else(|error| {
                            warn!(
                                subscriber_id,
                                window_start = %window.start,
                                window_end = %window.end,
                                error = %error,
                                "usage window failed, counting as zero"
                            );
                            0.0
                        })
                    })
                    .collect::<Vec<f64>>()
            }
            WindowFailurePolicy::FailFast => {
                try_join_all(self.windows.iter().map(|window| async move {
                    self.window_cost(subscriber_id, window)
                        .await
                        .map_err(|source| UsageError::Window {
                            subscriber_id,
                            start: window.start,
                            end: window.end,
                            source,
                        })
                }))
                .await?
            }
        };

        let total = round_cost(costs.iter().sum());
        log_cost_event!(subscriber_id, windows = costs.len(), cost = total);
        Ok(total)
    }

    /// Reseller cost for one window; a missing total counts as zero.
    async fn window_cost(&self, subscriber_id: i64, window: &UsageWindow) -> std::result::Result<f64, OcsError> {
        let request = OcsRequest::subscriber_usage_over_period(subscriber_id, window.start, window.end);
        let body = self.api.execute(&request).await?;

        let payload: Option<UsagePayload> = extract_payload(&body, request.operation())?;
        Ok(payload
            .and_then(|p| p.total)
            .and_then(|t| t.reseller_cost)
            .unwrap_or(0.0))
    }
}
