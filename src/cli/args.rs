use crate::io::OutputFormat;
use crate::strategy::{IngestJob, WorkerConfig, DEFAULT_BASE_URL};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Build a daily balance ledger from a paginated transactions feed
#[derive(Parser, Debug)]
#[command(name = "daily-balance-ledger")]
#[command(about = "Build a daily balance ledger from a paginated transactions feed", long_about = None)]
pub struct CliArgs {
    /// Root URL of the transactions provider
    #[arg(
        long = "base-url",
        value_name = "URL",
        env = "LEDGER_BASE_URL",
        default_value = DEFAULT_BASE_URL,
        help = "Provider root; pages are fetched from <URL>/transactions/<n>.json"
    )]
    pub base_url: String,

    /// Balance before the earliest transaction
    #[arg(
        long = "starting-balance",
        value_name = "AMOUNT",
        default_value = "0",
        allow_hyphen_values = true,
        help = "Balance before the earliest transaction (may be negative)"
    )]
    pub starting_balance: Decimal,

    /// Processing strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "concurrent",
        help = "Processing strategy: 'sequential' merges each page before the next fetch, 'concurrent' merges pages in parallel"
    )]
    pub strategy: StrategyType,

    /// Number of runtime worker threads (concurrent mode only)
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout-secs",
        value_name = "SECS",
        default_value_t = 100,
        help = "Per-request timeout in seconds"
    )]
    pub timeout_secs: u64,

    /// Output format
    #[arg(
        long = "format",
        value_name = "FORMAT",
        default_value = "text",
        help = "Output format: 'text' for one line per day or 'csv'"
    )]
    pub format: OutputFormat,

    /// Output file (stdout when omitted)
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Concurrent,
}

impl CliArgs {
    /// Create a WorkerConfig from CLI arguments
    ///
    /// Falls back to the default worker count when none was given. A zero
    /// count is replaced by the default with a warning.
    pub fn to_worker_config(&self) -> WorkerConfig {
        match self.worker_threads {
            Some(worker_threads) => WorkerConfig::new(worker_threads),
            None => WorkerConfig::default(),
        }
    }

    /// Create the IngestJob described by the CLI arguments
    pub fn to_job(&self) -> IngestJob {
        IngestJob {
            base_url: self.base_url.clone(),
            starting_balance: self.starting_balance,
            request_timeout: Duration::from_secs(self.timeout_secs),
            format: self.format,
        }
    }
}
