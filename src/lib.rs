//! Daily Balance Ledger Library
//! # Overview
//!
//! This library ingests a paginated transactions feed and maintains one
//! balance record per calendar day, implementing both a sequential and a
//! concurrent ingestion strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (DailyBalance, Transaction, BalanceError, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Day-keyed balance ledger with batch merging
//!   - [`core::orchestrator`] - Paginated fetching and merge dispatch
//!   - [`core::traits`] - Page source and batch sink abstractions
//! - [`io`] - Provider wire format, HTTP transport and output rendering
//! - [`strategy`] - Runtime setup for sequential and concurrent ingestion
//!
//! # Balance Chain
//!
//! Days are kept in ascending order. For every day:
//!
//! - `ending_balance = starting_balance + net_transactions`
//! - the first day starts at the ledger's starting balance
//! - every later day starts at the previous day's ending balance
//!
//! Inserting a batch sums its transactions per day, folds them into the
//! affected days and re-derives the chain from the earliest affected day
//! onwards. Batches can be merged concurrently and in any order; the result
//! is the same as merging them one after another.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use crate::core::{BatchSink, DailyBalanceLedger, IngestSummary, IngestionOrchestrator, PageSource};
pub use crate::io::{write_daily_balances, HttpPageSource, OutputFormat};
pub use crate::types::{BalanceError, DailyBalance, PageNumber, PageResponse, Transaction};
