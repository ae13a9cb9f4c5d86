//! teltrip - per-subscriber usage and cost report for an OCS account
//!
//! ## Usage
//!
//! ```bash
//! # Aggregate the default account (OCS_ACCOUNT_ID or config file)
//! teltrip
//!
//! # A specific account, with account totals, pretty-printed
//! teltrip --account-id 3771 --totals --pretty
//!
//! # Report failed subscribers instead of aborting
//! teltrip --outcomes
//!
//! # With verbose logging
//! teltrip -v
//! ```
//!
//! The result is written to stdout as a JSON envelope:
//! `{"ok": true, "data": [...]}` on success and
//! `{"ok": false, "error": "..."}` (exit code 1) on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};
use teltrip_core::{AppConfig, LogGuard, init_logging};
use teltrip_usage::{AccountTotals, AggregatedRecord, UsagePipeline};
use tracing::{error, info};

/// Per-subscriber usage and cost aggregation over an OCS charging API
#[derive(Parser, Debug)]
#[command(name = "teltrip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Account to aggregate (defaults to OCS_ACCOUNT_ID or the config file)
    #[arg(long)]
    account_id: Option<String>,

    /// Configuration file (defaults to ~/.teltrip/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for log files (defaults to ~/.teltrip/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit one tagged outcome per subscriber instead of failing the run
    #[arg(long)]
    outcomes: bool,

    /// Include account-level totals
    #[arg(long)]
    totals: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(&cli).await {
        Ok(data) => {
            print_json(&with_ok(data), cli.pretty);
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("teltrip failed: {}", message);
            print_json(&json!({"ok": false, "error": message}), cli.pretty);
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> teltrip_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

/// Load config, run the pipeline and build the success envelope body.
async fn run(cli: &Cli) -> Result<Value, String> {
    let config = AppConfig::load(cli.config.as_deref()).map_err(|e| match e.guidance() {
        Some(hint) => format!("{} ({})", e, hint),
        None => e.to_string(),
    })?;
    let pipeline = UsagePipeline::from_config(&config).map_err(|e| e.friendly_message())?;
    let account_id = cli.account_id.as_deref();

    info!(account = ?account_id, outcomes = cli.outcomes, "starting aggregation");

    if cli.outcomes {
        let outcomes = pipeline
            .aggregate_outcomes(account_id)
            .await
            .map_err(|e| e.friendly_message())?;
        let records: Vec<AggregatedRecord> =
            outcomes.iter().filter_map(|o| o.record().cloned()).collect();
        envelope(&outcomes, cli.totals.then(|| AccountTotals::from_records(&records)))
    } else {
        let records = pipeline
            .aggregate(account_id)
            .await
            .map_err(|e| e.friendly_message())?;
        envelope(&records, cli.totals.then(|| AccountTotals::from_records(&records)))
    }
}

fn envelope<T: Serialize>(data: &T, totals: Option<AccountTotals>) -> Result<Value, String> {
    let mut body = json!({ "data": data });
    if let Some(totals) = totals {
        body["totals"] = serde_json::to_value(totals).map_err(|e| e.to_string())?;
    }
    Ok(body)
}

fn with_ok(mut body: Value) -> Value {
    body["ok"] = Value::Bool(true);
    body
}

fn print_json(value: &Value, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render output: {}", e),
    }
}
