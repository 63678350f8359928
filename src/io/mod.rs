//! I/O module
//!
//! Handles the transactions provider and ledger output.
//!
//! # Components
//!
//! - `wire` - JSON page format (lenient amounts and dates)
//! - `http_source` - `PageSource` over the provider's REST endpoint
//! - `output` - Text and CSV rendering of daily balances

pub mod http_source;
pub mod output;
pub mod wire;

pub use http_source::HttpPageSource;
pub use output::{write_daily_balances, OutputFormat};
pub use wire::decode_page;
