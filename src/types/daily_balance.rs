//! Per-day balance record
//!
//! This module defines the DailyBalance structure: the starting balance, the
//! net sum of that day's transactions and the resulting ending balance.

use super::error::BalanceError;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Format an amount with exactly two decimals, rounding half away from zero
pub fn format_cents(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// One calendar day of account activity
///
/// Invariant: `ending_balance == starting_balance + net_transactions` after
/// every mutation. Only the ledger mutates a DailyBalance; callers receive
/// copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyBalance {
    /// The calendar day (no time component)
    pub day: NaiveDate,

    /// Balance carried in from the previous day (or the account's starting balance)
    pub starting_balance: Decimal,

    /// Sum of every transaction that landed on this day
    pub net_transactions: Decimal,

    /// Balance at the end of the day
    pub ending_balance: Decimal,
}

impl DailyBalance {
    /// Create a day whose starting balance is zero and net is `net_transactions`
    ///
    /// The starting balance is fixed afterwards by the ledger's propagation
    /// sweep.
    pub fn new(day: NaiveDate, net_transactions: Decimal) -> Self {
        DailyBalance {
            day,
            starting_balance: Decimal::ZERO,
            net_transactions,
            ending_balance: net_transactions,
        }
    }

    /// Add `amount` to the day's net and recompute the ending balance
    ///
    /// Uses checked arithmetic; the day is left untouched on overflow.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the net or ending balance would overflow.
    pub fn add_to_net(&mut self, amount: Decimal) -> Result<(), BalanceError> {
        let net_transactions = self
            .net_transactions
            .checked_add(amount)
            .ok_or_else(|| BalanceError::arithmetic_overflow("add_to_net", self.day))?;

        let ending_balance = self
            .starting_balance
            .checked_add(net_transactions)
            .ok_or_else(|| BalanceError::arithmetic_overflow("add_to_net", self.day))?;

        self.net_transactions = net_transactions;
        self.ending_balance = ending_balance;

        Ok(())
    }

    /// Overwrite the starting balance and recompute the ending balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the ending balance would overflow.
    pub fn set_starting_balance(&mut self, value: Decimal) -> Result<(), BalanceError> {
        let ending_balance = value.checked_add(self.net_transactions).ok_or_else(|| {
            BalanceError::arithmetic_overflow("set_starting_balance", self.day)
        })?;

        self.starting_balance = value;
        self.ending_balance = ending_balance;

        Ok(())
    }
}

impl fmt::Display for DailyBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.day.format("%Y-%m-%d"),
            format_cents(self.ending_balance)
        )
    }
}
