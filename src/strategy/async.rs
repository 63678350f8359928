//! Concurrent processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Pages are still fetched one after another, but
//! every received page is merged on tokio's blocking pool while the next page
//! is in flight.
//!
//! # Architecture
//!
//! ```text
//! ConcurrentProcessingStrategy
//!     ├── WorkerConfig (worker_threads)
//!     ├── HttpPageSource (sequential page fetches)
//!     ├── IngestionOrchestrator (MergeMode::Concurrent)
//!     │     └── spawn_blocking merge per page
//!     └── Arc<DailyBalanceLedger> (RwLock-guarded day map)
//! ```
//!
//! Merges may complete in any order. The ledger's batch merge is order
//! independent, so the final output matches the sequential strategy.

use std::io::Write;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::MergeMode;
use crate::strategy::{finish, ingest, IngestJob, IngestReport, ProcessingStrategy};
use crate::types::BalanceError;

/// Configuration for the multi-threaded runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of tokio worker threads
    pub worker_threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

impl WorkerConfig {
    /// Create a new WorkerConfig, falling back to the default for zero
    pub fn new(worker_threads: usize) -> Self {
        let worker_threads = if worker_threads == 0 {
            let default = Self::default();
            warn!(
                requested = worker_threads,
                fallback = default.worker_threads,
                "invalid worker thread count, using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self { worker_threads }
    }
}

/// Concurrent processing strategy
///
/// # Configuration
///
/// The strategy accepts a WorkerConfig with:
/// - `worker_threads`: Number of runtime worker threads (default: CPU cores)
#[derive(Debug, Clone)]
pub struct ConcurrentProcessingStrategy {
    config: WorkerConfig,
}

impl ConcurrentProcessingStrategy {
    /// Create a new ConcurrentProcessingStrategy with the specified configuration
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// The runtime configuration in use
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

impl ProcessingStrategy for ConcurrentProcessingStrategy {
    /// Ingest all pages with merges running concurrently with fetching
    ///
    /// 1. Creates a multi-threaded tokio runtime with the configured workers
    /// 2. Runs the orchestrator in `MergeMode::Concurrent`
    /// 3. Waits for every merge to finish
    /// 4. Writes the ledger snapshot to output
    fn process(
        &self,
        job: &IngestJob,
        cancel: &CancellationToken,
        output: &mut dyn Write,
    ) -> Result<IngestReport, BalanceError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_all()
            .build()
            .map_err(|e| BalanceError::invalid_config(&format!("tokio runtime: {}", e)))?;

        let (ledger, summary) = runtime.block_on(ingest(job, MergeMode::Concurrent, cancel))?;

        finish(&ledger, summary, job.format, output)
    }
}
