//! Transaction-related types for the daily balance ledger
//!
//! This module defines the transaction record and the page of transactions
//! returned by a page source.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Page index as used by the transactions provider (1-based)
pub type PageNumber = u32;

/// A single dated financial transaction
///
/// Only `date` (truncated to the calendar day) and `amount` affect balances.
/// The ledger label and counterparty are carried for display and debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// When the transaction happened
    pub date: NaiveDateTime,

    /// Signed amount; negative values are debits
    pub amount: Decimal,

    /// Ledger (expense category) label
    pub ledger: String,

    /// Counterparty name
    pub company: String,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        date: NaiveDateTime,
        amount: Decimal,
        ledger: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Transaction {
            date,
            amount,
            ledger: ledger.into(),
            company: company.into(),
        }
    }

    /// The calendar day this transaction lands on (time of day discarded)
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

/// One page of transactions from the provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResponse {
    /// Total number of transactions across all pages
    ///
    /// Only the value on page 1 is authoritative.
    pub total_count: u64,

    /// The page index the provider claims to have returned
    pub page: PageNumber,

    /// Transactions on this page
    pub transactions: Vec<Transaction>,
}
