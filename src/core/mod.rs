//! Core business logic module
//!
//! This module contains the balance tracking and ingestion components:
//! - `traits` - Trait abstractions for page sources and batch sinks
//! - `ledger` - Day-keyed balance ledger with batch merging
//! - `orchestrator` - Paginated fetching with concurrent merge dispatch

pub mod ledger;
pub mod orchestrator;
pub mod traits;

pub use ledger::DailyBalanceLedger;
pub use orchestrator::{IngestSummary, IngestionOrchestrator, MergeMode};
pub use traits::{BatchSink, PageSource};
