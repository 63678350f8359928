//! Sequential processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. Pages are fetched on a current-thread tokio
//! runtime and each page is merged into the ledger before the next one is
//! requested.
//!
//! # Design
//!
//! The SequentialProcessingStrategy focuses on orchestration, delegating:
//! - Page retrieval to `HttpPageSource`
//! - Pagination to `IngestionOrchestrator` in `MergeMode::Inline`
//! - Rendering to `output::write_daily_balances`
//!
//! It produces the same ledger as the concurrent strategy for the same pages
//! and is the simpler model to reason about when debugging a provider.

use std::io::Write;

use tokio_util::sync::CancellationToken;

use crate::core::MergeMode;
use crate::strategy::{finish, ingest, IngestJob, IngestReport, ProcessingStrategy};
use crate::types::BalanceError;

/// Sequential processing strategy
///
/// # Examples
///
/// ```no_run
/// use daily_balance_ledger::strategy::{IngestJob, ProcessingStrategy, SequentialProcessingStrategy};
/// use tokio_util::sync::CancellationToken;
/// use std::io;
///
/// let strategy = SequentialProcessingStrategy;
/// let mut output = io::stdout();
///
/// strategy
///     .process(&IngestJob::default(), &CancellationToken::new(), &mut output)
///     .expect("Ingestion failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SequentialProcessingStrategy;

impl ProcessingStrategy for SequentialProcessingStrategy {
    fn process(
        &self,
        job: &IngestJob,
        cancel: &CancellationToken,
        output: &mut dyn Write,
    ) -> Result<IngestReport, BalanceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BalanceError::invalid_config(&format!("tokio runtime: {}", e)))?;

        let (ledger, summary) = runtime.block_on(ingest(job, MergeMode::Inline, cancel))?;

        finish(&ledger, summary, job.format, output)
    }
}
