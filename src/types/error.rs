//! Error types for the daily balance ledger
//!
//! This module defines all error types that can occur while fetching pages of
//! transactions, merging them into the ledger and writing the result.
//! Errors are designed to be descriptive and user-friendly for CLI output.
//!
//! # Error Categories
//!
//! - **Transport Errors**: Non-success HTTP status, connection failures
//! - **Decode Errors**: Page body that is not valid page JSON
//! - **Protocol Errors**: Page index mismatch, pagination that stops early
//! - **Arithmetic Errors**: Overflow in balance calculations
//! - **Output Errors**: Failures writing the ledger snapshot

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the ledger and its ingestion pipeline
///
/// Every variant is fatal for the ingestion run that produced it. Nothing in
/// the core retries; retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BalanceError {
    /// The page request completed with a non-success status code
    #[error("HTTP {status} from {url}: {message}")]
    Transport {
        /// Numeric HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Reason phrase and (truncated) response body
        message: String,
    },

    /// The page request never produced a response (DNS, refused, timeout, ...)
    #[error("Request to {url} failed: {message}")]
    Connection {
        /// Requested URL
        url: String,
        /// Description of the underlying failure
        message: String,
    },

    /// The response body could not be decoded into a page
    ///
    /// Line and column point into the response body.
    #[error("Malformed data for page {page} at line {line} column {column}: {message}")]
    Decode {
        /// Page that was being decoded
        page: u32,
        /// Line of the decode failure (1-based, 0 if unknown)
        line: usize,
        /// Column of the decode failure (1-based, 0 if unknown)
        column: usize,
        /// Description of the decode failure
        message: String,
    },

    /// The provider answered with a different page than the one requested
    #[error("Invalid page information: expected page {requested} but received {received}")]
    PageMismatch {
        /// Page index that was requested
        requested: u32,
        /// Page index the provider declared in its response
        received: u32,
    },

    /// A page came back empty before the declared total was reached
    #[error("Pagination stopped at page {page}: received {received} of {expected} transactions")]
    IncompletePagination {
        /// Empty page index
        page: u32,
        /// Total transaction count declared on page 1
        expected: u64,
        /// Transactions received so far
        received: u64,
    },

    /// Cooperative cancellation was requested
    #[error("Ingestion cancelled")]
    Cancelled,

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for {day}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Day whose balance overflowed
        day: NaiveDate,
    },

    /// A spawned merge task panicked or was aborted
    #[error("Merge task failed: {message}")]
    MergeFailed {
        /// Description of the join failure
        message: String,
    },

    /// I/O error occurred while writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// CSV output could not be written
    #[error("Output error: {message}")]
    Output {
        /// Description of the output error
        message: String,
    },

    /// Configuration could not be turned into a working pipeline
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },
}

// Conversion from io::Error to BalanceError
impl From<std::io::Error> for BalanceError {
    fn from(error: std::io::Error) -> Self {
        BalanceError::Io {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to BalanceError
impl From<csv::Error> for BalanceError {
    fn from(error: csv::Error) -> Self {
        BalanceError::Output {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl BalanceError {
    /// Create a Transport error
    pub fn transport(status: u16, url: &str, message: &str) -> Self {
        BalanceError::Transport {
            status,
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Connection error
    pub fn connection(url: &str, message: &str) -> Self {
        BalanceError::Connection {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Decode error from a serde_json failure
    ///
    /// Keeps the position reported by the parser so the malformed spot in the
    /// body can be located.
    pub fn decode(page: u32, error: &serde_json::Error) -> Self {
        BalanceError::Decode {
            page,
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        }
    }

    /// Create a PageMismatch error
    pub fn page_mismatch(requested: u32, received: u32) -> Self {
        BalanceError::PageMismatch {
            requested,
            received,
        }
    }

    /// Create an IncompletePagination error
    pub fn incomplete_pagination(page: u32, expected: u64, received: u64) -> Self {
        BalanceError::IncompletePagination {
            page,
            expected,
            received,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, day: NaiveDate) -> Self {
        BalanceError::ArithmeticOverflow {
            operation: operation.to_string(),
            day,
        }
    }

    /// Create a MergeFailed error
    pub fn merge_failed(message: &str) -> Self {
        BalanceError::MergeFailed {
            message: message.to_string(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: &str) -> Self {
        BalanceError::InvalidConfig {
            message: message.to_string(),
        }
    }

    /// Whether this error is the result of cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BalanceError::Cancelled)
    }
}
