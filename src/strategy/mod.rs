//! Processing strategy module for ledger ingestion
//!
//! This module defines the Strategy pattern for the complete ingestion pipeline,
//! encompassing the async runtime, page fetching, merging into the ledger and
//! output rendering. This allows different execution models (single-threaded
//! inline merging, multi-threaded concurrent merging) to be selected at runtime.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::StrategyType;
use crate::core::{DailyBalanceLedger, IngestSummary, IngestionOrchestrator, MergeMode};
use crate::io::{write_daily_balances, HttpPageSource, OutputFormat};
use crate::types::BalanceError;

pub mod r#async;
pub mod sync;

pub use self::r#async::{ConcurrentProcessingStrategy, WorkerConfig};
pub use sync::SequentialProcessingStrategy;

/// Provider used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://resttest.bench.co";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

/// What to ingest and how to render it
#[derive(Debug, Clone, PartialEq)]
pub struct IngestJob {
    /// Provider root; pages live under `<base_url>/transactions/<n>.json`
    pub base_url: String,

    /// Balance before the earliest transaction
    pub starting_balance: Decimal,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Output layout
    pub format: OutputFormat,
}

impl Default for IngestJob {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            starting_balance: Decimal::ZERO,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            format: OutputFormat::Text,
        }
    }
}

/// Result of a successful ingestion run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestReport {
    /// Pages and transactions processed
    pub summary: IngestSummary,

    /// Number of distinct days in the ledger
    pub days: usize,

    /// Ending balance of the latest day, or the starting balance if empty
    pub current_balance: Decimal,
}

/// Processing strategy trait for complete ingestion pipelines
///
/// Each strategy owns its async runtime, fetches every page described by the
/// job, merges them into a fresh ledger and writes the final daily balances
/// to `output`.
pub trait ProcessingStrategy: Send + Sync {
    /// Ingest all pages and write the resulting daily balances
    ///
    /// # Arguments
    ///
    /// * `job` - Provider, starting balance, timeout and output format
    /// * `cancel` - Cancellation signal; Ctrl-C is wired to it while running
    /// * `output` - Writer receiving the rendered ledger
    ///
    /// # Returns
    ///
    /// * `Ok(IngestReport)` once every page was merged and output written
    /// * `Err(BalanceError)` on the first fatal error
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The runtime or HTTP client cannot be built (`InvalidConfig`)
    /// - Any page fails to fetch, decode or merge
    /// - The run is cancelled (`Cancelled`)
    /// - Output cannot be written
    ///
    /// Nothing is written to `output` unless ingestion succeeded.
    fn process(
        &self,
        job: &IngestJob,
        cancel: &CancellationToken,
        output: &mut dyn Write,
    ) -> Result<IngestReport, BalanceError>;

    /// Ingest all pages, then write the ledger to a file or stdout
    ///
    /// The ledger is rendered in memory first, so a failed run leaves an
    /// existing `destination` file untouched.
    ///
    /// # Arguments
    ///
    /// * `job` - Provider, starting balance, timeout and output format
    /// * `cancel` - Cancellation signal
    /// * `destination` - File to create or replace; stdout when `None`
    ///
    /// # Errors
    ///
    /// Same as [`ProcessingStrategy::process`], plus `Io` if the destination
    /// cannot be written.
    fn process_to(
        &self,
        job: &IngestJob,
        cancel: &CancellationToken,
        destination: Option<&Path>,
    ) -> Result<IngestReport, BalanceError> {
        let mut rendered = Vec::new();
        let report = self.process(job, cancel, &mut rendered)?;

        match destination {
            Some(path) => fs::write(path, &rendered)?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&rendered)?;
                stdout.flush()?;
            }
        }

        Ok(report)
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create
/// * `config` - Optional worker configuration (ignored for sequential)
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<WorkerConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sequential => Box::new(SequentialProcessingStrategy),
        StrategyType::Concurrent => {
            let config = config.unwrap_or_default();
            Box::new(ConcurrentProcessingStrategy::new(config))
        }
    }
}

/// Fetch and merge every page into a new ledger
async fn ingest(
    job: &IngestJob,
    mode: MergeMode,
    cancel: &CancellationToken,
) -> Result<(Arc<DailyBalanceLedger>, IngestSummary), BalanceError> {
    watch_interrupt(cancel);

    let source = HttpPageSource::new(&job.base_url, job.request_timeout)?;
    let ledger = Arc::new(DailyBalanceLedger::new(job.starting_balance));

    let summary = IngestionOrchestrator::new(source)
        .with_mode(mode)
        .run(Arc::clone(&ledger), cancel)
        .await?;

    Ok((ledger, summary))
}

/// Render the ledger and build the report
fn finish(
    ledger: &DailyBalanceLedger,
    summary: IngestSummary,
    format: OutputFormat,
    output: &mut dyn Write,
) -> Result<IngestReport, BalanceError> {
    let balances = ledger.snapshot();
    write_daily_balances(&balances, format, output)?;

    Ok(IngestReport {
        summary,
        days: balances.len(),
        current_balance: ledger.current_balance(),
    })
}

/// Cancel `cancel` on Ctrl-C for as long as the current runtime lives
fn watch_interrupt(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    warn!("interrupt received, cancelling ingestion");
                    cancel.cancel();
                }
            }
        }
    });
}
