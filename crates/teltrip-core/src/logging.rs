//! Logging infrastructure for teltrip.
//!
//! Structured logging on the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.teltrip/logs/teltrip.log` (daily rotation)
//! - Compact human-readable output on stderr
//! - `RUST_LOG` overrides the default `teltrip=info` filter
//!
//! ## Example
//!
//! ```no_run
//! use teltrip_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//! tracing::info!(account_id = "3771", "aggregation started");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::teltrip_dir;
use crate::error::{CoreError, Result};

/// Guard that must be held to ensure log flushing on shutdown.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the teltrip logging system.
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.teltrip/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// Keep the returned [`LogGuard`] alive for the lifetime of the process.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| CoreError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "teltrip.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("teltrip={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| CoreError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Get the default log directory path.
///
/// Returns `~/.teltrip/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(teltrip_dir()?.join("logs"))
}

/// Get the default log file path.
///
/// Returns `~/.teltrip/logs/teltrip.log`
pub fn default_log_file() -> Result<PathBuf> {
    Ok(default_log_dir()?.join("teltrip.log"))
}

/// Log one upstream OCS call.
///
/// ```ignore
/// log_upstream_call!("listSubscriber", elapsed_ms = 12);
/// log_upstream_call!("subscriberUsageOverPeriod", status = 500, error = "boom");
/// ```
#[macro_export]
macro_rules! log_upstream_call {
    ($operation:expr) => {
        tracing::debug!(
            target: "teltrip::ocs",
            operation = $operation,
            "upstream call"
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug!(
            target: "teltrip::ocs",
            operation = $operation,
            $($field)*,
            "upstream call"
        )
    };
}

/// Log a cost figure produced by the pipeline.
///
/// ```ignore
/// log_cost_event!(subscriber_id = 42, windows = 3, cost = 30.0);
/// ```
#[macro_export]
macro_rules! log_cost_event {
    ($($field:tt)*) => {
        tracing::debug!(
            target: "teltrip::cost",
            $($field)*,
            "cost event"
        )
    };
}
