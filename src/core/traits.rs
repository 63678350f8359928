//! Core traits for page retrieval and batch merging
//!
//! This module defines the trait abstractions the ingestion orchestrator is
//! written against, so that the HTTP transport and the ledger can be swapped
//! for scripted doubles in tests.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::types::{BalanceError, PageNumber, PageResponse, Transaction};

/// Source of transaction pages
///
/// Pages are requested one at a time by 1-based index. Implementations must
/// report a non-success response as `Transport`, an undecodable body as
/// `Decode` and an observed cancellation as `Cancelled`.
pub trait PageSource: Send + Sync {
    /// Fetch one page of transactions
    fn fetch_page(
        &self,
        page_number: PageNumber,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<PageResponse, BalanceError>> + Send;
}

/// Destination for batches of transactions
///
/// Implementations must accept concurrent calls from multiple threads and
/// must leave themselves consistent when each call returns, whatever order
/// batches arrive in.
pub trait BatchSink: Send + Sync {
    /// Merge one batch of transactions
    fn insert_batch(&self, transactions: &[Transaction]) -> Result<(), BalanceError>;
}
