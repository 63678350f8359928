//! Rendering of daily balances
//!
//! Rows are written in the order given, which for a ledger snapshot is
//! ascending by day.

use std::io::Write;

use clap::ValueEnum;
use csv::Writer;

use crate::types::daily_balance::format_cents;
use crate::types::{BalanceError, DailyBalance};

/// Output layout for the final ledger
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `YYYY-MM-DD <balance>` line per day
    #[default]
    Text,

    /// CSV with starting balance, net change and ending balance per day
    Csv,
}

/// Write daily balances in the requested format
///
/// # Arguments
///
/// * `balances` - Rows to write, already in display order
/// * `format` - Output layout
/// * `output` - Destination writer
///
/// # Errors
///
/// Returns `Io` or `Output` if the writer fails.
pub fn write_daily_balances(
    balances: &[DailyBalance],
    format: OutputFormat,
    output: &mut dyn Write,
) -> Result<(), BalanceError> {
    match format {
        OutputFormat::Text => {
            for balance in balances {
                writeln!(output, "{}", balance)?;
            }
            output.flush()?;
        }
        OutputFormat::Csv => {
            let mut writer = Writer::from_writer(output);
            writer.write_record([
                "day",
                "starting_balance",
                "net_transactions",
                "ending_balance",
            ])?;

            for balance in balances {
                writer.write_record(&[
                    balance.day.format("%Y-%m-%d").to_string(),
                    format_cents(balance.starting_balance),
                    format_cents(balance.net_transactions),
                    format_cents(balance.ending_balance),
                ])?;
            }

            writer.flush()?;
        }
    }

    Ok(())
}
