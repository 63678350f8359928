//! Daily Balance Ledger CLI
//!
//! Command-line interface that pulls every page of a transactions feed and
//! prints the end-of-day balance for each day with activity.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --strategy sequential
//! cargo run -- --base-url http://localhost:8080 --starting-balance 1000
//! cargo run -- --strategy concurrent --worker-threads 8 --format csv --output ledger.csv
//! ```
//!
//! The ledger is written to stdout (or `--output`). Logs go to stderr and are
//! controlled with `RUST_LOG`.
//!
//! # Processing Strategies
//!
//! - **sequential**: Single-threaded runtime, each page merged before the next fetch
//! - **concurrent**: Multi-threaded runtime, pages merged while the next one is fetched (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (network failure, malformed page, output failure, ...)
//! - 130: Interrupted with Ctrl-C

use daily_balance_ledger::cli;
use daily_balance_ledger::strategy;
use std::io;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn main() {
    // Logs go to stderr so stdout only carries the ledger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("daily_balance_ledger=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Concurrent) {
            Some(args.to_worker_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let job = args.to_job();
    let cancel = CancellationToken::new();

    match strategy.process_to(&job, &cancel, args.output.as_deref()) {
        Ok(report) => info!(
            pages = report.summary.pages,
            transactions = report.summary.transactions,
            days = report.days,
            balance = %report.current_balance,
            "ledger complete"
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(if e.is_cancelled() { 130 } else { 1 });
        }
    }
}
