//! Paginated ingestion into the ledger
//!
//! This module provides the `IngestionOrchestrator`, which pulls pages from a
//! `PageSource` one at a time and hands each page's transactions to a
//! `BatchSink` as one batch.
//!
//! # Design
//!
//! ```text
//! fetch page 1 ──► spawn merge(page 1)
//! fetch page 2 ──► spawn merge(page 2)        (merge 1 may still be running)
//! ...
//! fetch page N ──► spawn merge(page N)
//! join all merges ──► summary
//! ```
//!
//! Fetching is strictly sequential because pagination is index based. Merges
//! are CPU bound and run on tokio's blocking pool, so the network wait for
//! page N+1 overlaps the merge of page N. Merges may finish in any order; the
//! sink is responsible for staying consistent regardless.
//!
//! The total transaction count is read from page 1 only. Fetching stops once
//! the number of transactions received reaches it.
//!
//! # Cancellation
//!
//! The token is checked before every page request, passed down to the source
//! and raced against the final join. Merges already dispatched are not rolled
//! back.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::traits::{BatchSink, PageSource};
use crate::types::{BalanceError, PageNumber, Transaction};

/// How each received page is merged into the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Spawn an independent merge task per page and keep fetching
    #[default]
    Concurrent,

    /// Merge each page before requesting the next one
    Inline,
}

/// Outcome of a completed ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    /// Number of pages fetched
    pub pages: u32,

    /// Number of transactions received across all pages
    pub transactions: u64,

    /// Total transaction count declared on page 1
    pub expected: u64,
}

/// Drives paginated fetching and dispatches merges
#[derive(Debug)]
pub struct IngestionOrchestrator<S> {
    source: S,
    mode: MergeMode,
}

impl<S: PageSource> IngestionOrchestrator<S> {
    /// Create an orchestrator that merges pages concurrently
    pub fn new(source: S) -> Self {
        Self {
            source,
            mode: MergeMode::Concurrent,
        }
    }

    /// Select how pages are merged
    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    /// The page source this orchestrator pulls from
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every page and merge it into `sink`
    ///
    /// Returns once every dispatched merge has finished. Reads of the sink
    /// performed after this returns observe every page.
    ///
    /// # Arguments
    ///
    /// * `sink` - Shared destination for each page's transactions
    /// * `cancel` - Cooperative cancellation signal
    ///
    /// # Errors
    ///
    /// Returns the first error encountered:
    /// - Any error from the page source (`Transport`, `Connection`, `Decode`, ...)
    /// - `PageMismatch` if a page declares a different index than requested
    /// - `IncompletePagination` if a page is empty before the total is reached
    /// - Any error returned by a merge, or `MergeFailed` if a merge task panicked
    /// - `Cancelled` if the token fires between pages or during the final join
    pub async fn run<L>(
        &self,
        sink: Arc<L>,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, BalanceError>
    where
        L: BatchSink + 'static,
    {
        let mut merges: JoinSet<Result<(), BalanceError>> = JoinSet::new();
        let mut summary = IngestSummary::default();
        let mut page_number: PageNumber = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(BalanceError::Cancelled);
            }

            let page = self.source.fetch_page(page_number, cancel).await?;

            if page.page != page_number {
                return Err(BalanceError::page_mismatch(page_number, page.page));
            }

            if page_number == 1 {
                summary.expected = page.total_count;
            } else if page.total_count != summary.expected {
                warn!(
                    page = page_number,
                    declared = page.total_count,
                    expected = summary.expected,
                    "page declares a different total count; keeping page 1's"
                );
            }

            let received = page.transactions.len() as u64;
            summary.pages += 1;
            summary.transactions += received;

            debug!(
                page = page_number,
                transactions = received,
                total_received = summary.transactions,
                expected = summary.expected,
                "received page"
            );

            self.dispatch(&mut merges, &sink, page.transactions)?;
            reap_finished(&mut merges)?;

            if summary.transactions >= summary.expected {
                break;
            }
            if received == 0 {
                return Err(BalanceError::incomplete_pagination(
                    page_number,
                    summary.expected,
                    summary.transactions,
                ));
            }

            page_number += 1;
        }

        wait_for_merges(&mut merges, cancel).await?;

        info!(
            pages = summary.pages,
            transactions = summary.transactions,
            "ingestion complete"
        );

        Ok(summary)
    }

    /// Hand one page's transactions to the sink according to the merge mode
    fn dispatch<L>(
        &self,
        merges: &mut JoinSet<Result<(), BalanceError>>,
        sink: &Arc<L>,
        transactions: Vec<Transaction>,
    ) -> Result<(), BalanceError>
    where
        L: BatchSink + 'static,
    {
        match self.mode {
            MergeMode::Inline => sink.insert_batch(&transactions),
            MergeMode::Concurrent => {
                let sink = Arc::clone(sink);
                merges.spawn_blocking(move || sink.insert_batch(&transactions));
                Ok(())
            }
        }
    }
}

/// Collect merges that already finished, failing on the first error
fn reap_finished(merges: &mut JoinSet<Result<(), BalanceError>>) -> Result<(), BalanceError> {
    while let Some(result) = merges.try_join_next() {
        merge_outcome(result)?;
    }
    Ok(())
}

/// Wait for every outstanding merge, or for cancellation
async fn wait_for_merges(
    merges: &mut JoinSet<Result<(), BalanceError>>,
    cancel: &CancellationToken,
) -> Result<(), BalanceError> {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BalanceError::Cancelled),
            next = merges.join_next() => match next {
                Some(result) => merge_outcome(result)?,
                None => return Ok(()),
            },
        }
    }
}

fn merge_outcome(result: Result<Result<(), BalanceError>, JoinError>) -> Result<(), BalanceError> {
    match result {
        Ok(outcome) => outcome,
        Err(e) => Err(BalanceError::merge_failed(&e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DailyBalanceLedger;
    use crate::types::PageResponse;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::time::Duration;

    /// Page source that replays a fixed script and records requests
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<PageResponse, BalanceError>>>,
        requests: Mutex<Vec<PageNumber>>,
        cancel_on_page: Option<PageNumber>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<PageResponse, BalanceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                cancel_on_page: None,
            }
        }

        fn cancelling_on(mut self, page: PageNumber) -> Self {
            self.cancel_on_page = Some(page);
            self
        }

        fn requests(&self) -> Vec<PageNumber> {
            self.requests.lock().clone()
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(
            &self,
            page_number: PageNumber,
            cancel: &CancellationToken,
        ) -> impl Future<Output = Result<PageResponse, BalanceError>> + Send {
            self.requests.lock().push(page_number);
            if self.cancel_on_page == Some(page_number) {
                cancel.cancel();
            }
            let next = self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(BalanceError::transport(404, "scripted", "no more pages")));
            async move { next }
        }
    }

    /// Sink that records each batch it receives
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<Transaction>>>,
        delay: Option<Duration>,
        fail_with: Option<BalanceError>,
    }

    impl BatchSink for RecordingSink {
        fn insert_batch(&self, transactions: &[Transaction]) -> Result<(), BalanceError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.batches.lock().push(transactions.to_vec());
            Ok(())
        }
    }

    fn tx(date: &str, amount: i64) -> Transaction {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Transaction::new(
            day.and_hms_opt(0, 0, 0).unwrap(),
            Decimal::from(amount),
            "Phone & Internet Expense",
            "SHAW CABLESYSTEMS CALGARY AB",
        )
    }

    fn page(total_count: u64, page: PageNumber, transactions: Vec<Transaction>) -> PageResponse {
        PageResponse {
            total_count,
            page,
            transactions,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_single_page_delivered_as_one_batch(
        #[values(MergeMode::Concurrent, MergeMode::Inline)] mode: MergeMode,
    ) {
        let transactions = vec![tx("2020-01-01", -10), tx("2020-01-01", -8)];
        let source = ScriptedSource::new(vec![Ok(page(2, 1, transactions.clone()))]);
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = IngestionOrchestrator::new(source).with_mode(mode);

        let summary = orchestrator
            .run(Arc::clone(&sink), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                pages: 1,
                transactions: 2,
                expected: 2
            }
        );
        assert_eq!(*sink.batches.lock(), vec![transactions]);
        assert_eq!(orchestrator.source().requests(), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_account_fetches_only_first_page() {
        let source = ScriptedSource::new(vec![Ok(page(0, 1, vec![]))]);
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = IngestionOrchestrator::new(source);

        let summary = orchestrator
            .run(Arc::clone(&sink), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.pages, 1);
        assert_eq!(summary.transactions, 0);
        assert_eq!(sink.batches.lock().len(), 1);
        assert_eq!(orchestrator.source().requests(), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fetches_until_declared_total_is_reached() {
        let source = ScriptedSource::new(vec![
            Ok(page(5, 1, vec![tx("2020-01-01", 1), tx("2020-01-02", 2)])),
            Ok(page(5, 2, vec![tx("2020-01-03", 3), tx("2020-01-04", 4)])),
            Ok(page(5, 3, vec![tx("2020-01-05", 5)])),
            Ok(page(5, 4, vec![tx("2020-01-06", 6)])),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = IngestionOrchestrator::new(source);

        let summary = orchestrator
            .run(Arc::clone(&sink), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.transactions, 5);
        assert_eq!(orchestrator.source().requests(), vec![1, 2, 3]);

        let mut sizes: Vec<usize> = sink.batches.lock().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_total_count_only_read_from_first_page() {
        let source = ScriptedSource::new(vec![
            Ok(page(2, 1, vec![tx("2020-01-01", 1)])),
            Ok(page(99, 2, vec![tx("2020-01-02", 1)])),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = IngestionOrchestrator::new(source);

        let summary = orchestrator
            .run(sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.expected, 2);
        assert_eq!(orchestrator.source().requests(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_page_mismatch_is_fatal() {
        let source = ScriptedSource::new(vec![
            Ok(page(4, 1, vec![tx("2020-01-01", 1), tx("2020-01-02", 1)])),
            Ok(page(4, 3, vec![tx("2020-01-03", 1), tx("2020-01-04", 1)])),
        ]);
        let orchestrator = IngestionOrchestrator::new(source);

        let result = orchestrator
            .run(Arc::new(RecordingSink::default()), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(BalanceError::page_mismatch(2, 3)));
    }

    #[tokio::test]
    async fn test_empty_page_before_total_is_fatal() {
        let source = ScriptedSource::new(vec![
            Ok(page(3, 1, vec![tx("2020-01-01", 1)])),
            Ok(page(3, 2, vec![])),
        ]);
        let orchestrator = IngestionOrchestrator::new(source);

        let result = orchestrator
            .run(Arc::new(RecordingSink::default()), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(BalanceError::incomplete_pagination(2, 3, 1)));
    }

    #[tokio::test]
    async fn test_source_error_is_propagated_without_retry() {
        let source = ScriptedSource::new(vec![
            Ok(page(4, 1, vec![tx("2020-01-01", 1), tx("2020-01-02", 1)])),
            Err(BalanceError::transport(503, "http://bank/transactions/2.json", "Service Unavailable")),
        ]);
        let orchestrator = IngestionOrchestrator::new(source);

        let result = orchestrator
            .run(Arc::new(RecordingSink::default()), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(BalanceError::Transport { status: 503, .. })
        ));
        assert_eq!(orchestrator.source().requests(), vec![1, 2]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_merge_error_is_propagated(
        #[values(MergeMode::Concurrent, MergeMode::Inline)] mode: MergeMode,
    ) {
        let overflow = BalanceError::arithmetic_overflow(
            "add_to_net",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        );
        let sink = Arc::new(RecordingSink {
            fail_with: Some(overflow.clone()),
            ..RecordingSink::default()
        });
        let source = ScriptedSource::new(vec![Ok(page(1, 1, vec![tx("2020-01-01", 1)]))]);
        let orchestrator = IngestionOrchestrator::new(source).with_mode(mode);

        let result = orchestrator.run(sink, &CancellationToken::new()).await;

        assert_eq!(result, Err(overflow));
    }

    #[tokio::test]
    async fn test_cancellation_between_pages_stops_fetching() {
        let source = ScriptedSource::new(vec![
            Ok(page(4, 1, vec![tx("2020-01-01", 1), tx("2020-01-02", 1)])),
            Ok(page(4, 2, vec![tx("2020-01-03", 1), tx("2020-01-04", 1)])),
        ])
        .cancelling_on(1);
        let orchestrator = IngestionOrchestrator::new(source);

        let result = orchestrator
            .run(Arc::new(RecordingSink::default()), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(BalanceError::Cancelled));
        assert_eq!(orchestrator.source().requests(), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_aborts_final_join() {
        let source = ScriptedSource::new(vec![Ok(page(1, 1, vec![tx("2020-01-01", 1)]))]);
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(300)),
            ..RecordingSink::default()
        });
        let orchestrator = IngestionOrchestrator::new(source);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = orchestrator.run(sink, &cancel).await;

        assert_eq!(result, Err(BalanceError::Cancelled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_match_inline_merges() {
        let pages: Vec<PageResponse> = (1..=6u32)
            .map(|number| {
                let transactions = (0..10)
                    .map(|i| {
                        let day = (number * 5 + i * 11) % 28 + 1;
                        tx(&format!("2020-03-{:02}", day), (number * 10 + i) as i64 - 30)
                    })
                    .collect();
                page(60, number, transactions)
            })
            .collect();

        let concurrent = Arc::new(DailyBalanceLedger::new(Decimal::from(100)));
        IngestionOrchestrator::new(ScriptedSource::new(pages.iter().cloned().map(Ok).collect()))
            .run(Arc::clone(&concurrent), &CancellationToken::new())
            .await
            .unwrap();

        let inline = Arc::new(DailyBalanceLedger::new(Decimal::from(100)));
        IngestionOrchestrator::new(ScriptedSource::new(pages.into_iter().map(Ok).collect()))
            .with_mode(MergeMode::Inline)
            .run(Arc::clone(&inline), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(concurrent.snapshot(), inline.snapshot());
        assert_eq!(concurrent.current_balance(), inline.current_balance());
    }
}
