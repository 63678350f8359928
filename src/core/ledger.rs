//! Day-granularity running balance ledger
//!
//! This module provides the `DailyBalanceLedger`, which keeps one
//! `DailyBalance` per calendar day touched by at least one transaction, ordered
//! by day, with every day's starting balance chained to the previous day's
//! ending balance.
//!
//! # Design
//!
//! Batches are merged in three steps:
//!
//! 1. **Pre-aggregate** (no lock): sum the batch per calendar day.
//! 2. **Integrate** (write lock): add each day's sum into the existing day or
//!    create the day, remembering the earliest day touched.
//! 3. **Propagate** (same write lock): fix the earliest touched day's starting
//!    balance from its predecessor (or the account's starting balance), then
//!    sweep forward re-chaining every later day.
//!
//! The cost of a batch is O(days in batch + days from the earliest touched day
//! to the last day) rather than O(all days) per transaction.
//!
//! # Thread Safety
//!
//! The ledger is shared behind an `Arc` and may be merged into from many tasks
//! at once. Steps 2 and 3 run under a single `parking_lot::RwLock` write guard,
//! so readers never observe a half-propagated chain. Batches may be merged in
//! any order; each merge restores the chain from whatever consistent state it
//! finds.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::trace;

use crate::core::traits::BatchSink;
use crate::types::{BalanceError, DailyBalance, Transaction};

/// Ordered, thread-safe collection of daily balances for one account
#[derive(Debug)]
pub struct DailyBalanceLedger {
    /// Balance of the account before its first recorded day
    starting_balance: Decimal,

    /// Days keyed by calendar date; iteration order is ascending
    days: RwLock<BTreeMap<NaiveDate, DailyBalance>>,
}

impl DailyBalanceLedger {
    /// Create an empty ledger
    ///
    /// # Arguments
    ///
    /// * `starting_balance` - Balance of the account before its first day
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            days: RwLock::new(BTreeMap::new()),
        }
    }

    /// Balance of the account before its first recorded day
    pub fn starting_balance(&self) -> Decimal {
        self.starting_balance
    }

    /// Insert a batch of transactions
    ///
    /// Pre-aggregates the batch outside the lock, then integrates and
    /// propagates under the write lock. The chain invariant holds again by
    /// the time this returns. An empty batch returns immediately without
    /// taking the lock.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if a day's net or balance would overflow.
    /// Days integrated before the overflow stay applied and the chain is
    /// re-propagated over them.
    pub fn insert_batch(&self, transactions: &[Transaction]) -> Result<(), BalanceError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let day_sums = sum_by_day(transactions)?;

        let mut days = self.days.write();
        let (earliest, integrated) = integrate(&mut days, &day_sums);
        if let Some(earliest) = earliest {
            propagate_from(&mut days, self.starting_balance, earliest)?;
        }
        integrated
    }

    /// Insert one transaction; shorthand for a single-element batch
    pub fn insert_single(&self, transaction: &Transaction) -> Result<(), BalanceError> {
        self.insert_batch(std::slice::from_ref(transaction))
    }

    /// Copy of every day in ascending date order
    pub fn snapshot(&self) -> Vec<DailyBalance> {
        self.days.read().values().copied().collect()
    }

    /// Iterate over a snapshot of every day in ascending date order
    ///
    /// Each call takes a fresh snapshot, so the iterator can be restarted by
    /// calling `iter` again.
    pub fn iter(&self) -> std::vec::IntoIter<DailyBalance> {
        self.snapshot().into_iter()
    }

    /// Visit every day in ascending date order under the read lock
    ///
    /// The visitor must not merge into this ledger; doing so deadlocks.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&DailyBalance),
    {
        for balance in self.days.read().values() {
            visitor(balance);
        }
    }

    /// Ending balance of the last day, or the starting balance if empty
    pub fn current_balance(&self) -> Decimal {
        self.days
            .read()
            .values()
            .next_back()
            .map(|balance| balance.ending_balance)
            .unwrap_or(self.starting_balance)
    }

    /// Number of days recorded
    pub fn len(&self) -> usize {
        self.days.read().len()
    }

    /// Whether no transaction has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.days.read().is_empty()
    }
}

impl BatchSink for DailyBalanceLedger {
    fn insert_batch(&self, transactions: &[Transaction]) -> Result<(), BalanceError> {
        DailyBalanceLedger::insert_batch(self, transactions)
    }
}

impl<'a> IntoIterator for &'a DailyBalanceLedger {
    type Item = DailyBalance;
    type IntoIter = std::vec::IntoIter<DailyBalance>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sum a batch per calendar day
///
/// Independent of ledger state; runs before the lock is taken.
fn sum_by_day(transactions: &[Transaction]) -> Result<HashMap<NaiveDate, Decimal>, BalanceError> {
    let mut day_sums: HashMap<NaiveDate, Decimal> = HashMap::new();

    for transaction in transactions {
        let day = transaction.day();
        let sum = day_sums.entry(day).or_insert(Decimal::ZERO);
        *sum = sum
            .checked_add(transaction.amount)
            .ok_or_else(|| BalanceError::arithmetic_overflow("sum_by_day", day))?;
    }

    Ok(day_sums)
}

/// Fold per-day sums into the ledger's days
///
/// New days start at zero; their real starting balance is fixed by
/// `propagate_from`. Returns the earliest day actually touched alongside the
/// outcome, so the caller can re-chain whatever was applied even when a day
/// overflowed.
fn integrate(
    days: &mut BTreeMap<NaiveDate, DailyBalance>,
    day_sums: &HashMap<NaiveDate, Decimal>,
) -> (Option<NaiveDate>, Result<(), BalanceError>) {
    let mut earliest: Option<NaiveDate> = None;

    for (&day, &sum) in day_sums {
        match days.entry(day) {
            Entry::Occupied(mut entry) => {
                if let Err(e) = entry.get_mut().add_to_net(sum) {
                    return (earliest, Err(e));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(DailyBalance::new(day, sum));
            }
        }
        earliest = Some(earliest.map_or(day, |current| current.min(day)));
    }

    (earliest, Ok(()))
}

/// Re-chain starting and ending balances from `earliest` to the last day
///
/// Running this on an already consistent ledger changes nothing.
fn propagate_from(
    days: &mut BTreeMap<NaiveDate, DailyBalance>,
    starting_balance: Decimal,
    earliest: NaiveDate,
) -> Result<(), BalanceError> {
    let mut previous_ending = days
        .range(..earliest)
        .next_back()
        .map(|(_, balance)| balance.ending_balance)
        .unwrap_or(starting_balance);

    let mut swept = 0usize;
    for balance in days.range_mut(earliest..).map(|(_, balance)| balance) {
        balance.set_starting_balance(previous_ending)?;
        previous_ending = balance.ending_balance;
        swept += 1;
    }

    trace!(%earliest, swept, "propagated daily balances");
    Ok(())
}
