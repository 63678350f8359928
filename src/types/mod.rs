//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `daily_balance`: Per-day balance record
//! - `transaction`: Transactions and pages of transactions
//! - `error`: Error types for the ledger and ingestion pipeline

pub mod daily_balance;
pub mod error;
pub mod transaction;

pub use daily_balance::DailyBalance;
pub use error::BalanceError;
pub use transaction::{PageNumber, PageResponse, Transaction};
