//! JSON wire format for transaction pages
//!
//! The provider returns pages shaped like:
//!
//! ```text
//! {
//!   "totalCount": 38,
//!   "page": 1,
//!   "transactions": [
//!     { "Date": "2013-12-22", "Ledger": "Phone & Internet Expense",
//!       "Amount": "-110.71", "Company": "SHAW CABLESYSTEMS CALGARY AB" }
//!   ]
//! }
//! ```
//!
//! Amounts may arrive as JSON numbers or as numeric strings, and dates come
//! in several layouts. Both are normalised here so the rest of the crate only
//! sees `Decimal` and `NaiveDateTime`.
//!
//! Keys are matched without regard to letter case or underscores, so
//! `totalCount`, `TotalCount` and `total_count` all name the same field.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;

use crate::types::{BalanceError, PageNumber, PageResponse, Transaction};

#[derive(Debug)]
struct WirePage {
    total_count: u64,
    page: PageNumber,
    transactions: Vec<WireTransaction>,
}

#[derive(Debug)]
struct WireTransaction {
    date: NaiveDateTime,
    ledger: String,
    amount: Decimal,
    company: String,
}

/// Amount given as a JSON number or a numeric string
struct WireAmount(Decimal);

/// Timestamp in any layout accepted by `parse_date`
struct WireDate(NaiveDateTime);

impl From<WireTransaction> for Transaction {
    fn from(wire: WireTransaction) -> Self {
        Transaction::new(wire.date, wire.amount, wire.ledger, wire.company)
    }
}

impl From<WirePage> for PageResponse {
    fn from(wire: WirePage) -> Self {
        PageResponse {
            total_count: wire.total_count,
            page: wire.page,
            transactions: wire.transactions.into_iter().map(Transaction::from).collect(),
        }
    }
}

/// Lowercase a key and drop underscores
fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Decode one page body
///
/// # Arguments
///
/// * `page` - The page index that was requested (used for error reporting)
/// * `body` - Raw response body
///
/// # Errors
///
/// Returns `Decode` with the line and column of the first problem if the body
/// is not valid JSON or does not have the expected shape.
pub fn decode_page(page: PageNumber, body: &[u8]) -> Result<PageResponse, BalanceError> {
    serde_json::from_slice::<WirePage>(body)
        .map(PageResponse::from)
        .map_err(|e| BalanceError::decode(page, &e))
}

/// Parse a decimal amount from text, accepting scientific notation
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Parse a transaction timestamp in any of the accepted layouts
///
/// Offsets are dropped and the local wall-clock time is kept, so a
/// transaction always lands on the calendar day the provider wrote.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0);
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(date);
        }
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(date.naive_local());
    }
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
}

struct PageVisitor;

impl<'de> Visitor<'de> for PageVisitor {
    type Value = WirePage;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a page object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WirePage, A::Error> {
        let mut total_count = None;
        let mut page = None;
        let mut transactions = None;

        while let Some(key) = map.next_key::<String>()? {
            match normalise_key(&key).as_str() {
                "totalcount" => total_count = Some(map.next_value::<u64>()?),
                "page" => page = Some(map.next_value::<PageNumber>()?),
                "transactions" => transactions = map.next_value::<Option<Vec<WireTransaction>>>()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(WirePage {
            total_count: total_count.ok_or_else(|| <A::Error as de::Error>::missing_field("totalCount"))?,
            page: page.ok_or_else(|| <A::Error as de::Error>::missing_field("page"))?,
            transactions: transactions.unwrap_or_default(),
        })
    }
}

impl<'de> Deserialize<'de> for WirePage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PageVisitor)
    }
}

struct TransactionVisitor;

impl<'de> Visitor<'de> for TransactionVisitor {
    type Value = WireTransaction;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a transaction object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WireTransaction, A::Error> {
        let mut date = None;
        let mut amount = None;
        let mut ledger = None;
        let mut company = None;

        while let Some(key) = map.next_key::<String>()? {
            match normalise_key(&key).as_str() {
                "date" => date = Some(map.next_value::<WireDate>()?.0),
                "amount" => amount = Some(map.next_value::<WireAmount>()?.0),
                "ledger" => ledger = map.next_value::<Option<String>>()?,
                "company" => company = map.next_value::<Option<String>>()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(WireTransaction {
            date: date.ok_or_else(|| <A::Error as de::Error>::missing_field("Date"))?,
            ledger: ledger.unwrap_or_default(),
            amount: amount.ok_or_else(|| <A::Error as de::Error>::missing_field("Amount"))?,
            company: company.unwrap_or_default(),
        })
    }
}

impl<'de> Deserialize<'de> for WireTransaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TransactionVisitor)
    }
}

impl<'de> Deserialize<'de> for WireAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Numbers keep their literal text, so no digits are lost to f64.
        let text = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::String(text) => text,
            other => {
                return Err(de::Error::custom(format!(
                    "expected a number or a numeric string, found {}",
                    other
                )))
            }
        };

        parse_amount(&text)
            .map(WireAmount)
            .ok_or_else(|| de::Error::custom(format!("invalid amount '{}'", text)))
    }
}

struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = NaiveDateTime;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a date string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<NaiveDateTime, E> {
        parse_date(value).ok_or_else(|| E::custom(format!("invalid date '{}'", value)))
    }
}

impl<'de> Deserialize<'de> for WireDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DateVisitor).map(WireDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_decode_provider_page() {
        let body = br#"{
            "totalCount": 38,
            "page": 1,
            "transactions": [
                {
                    "Date": "2013-12-22",
                    "Ledger": "Phone & Internet Expense",
                    "Amount": "-110.71",
                    "Company": "SHAW CABLESYSTEMS CALGARY AB"
                },
                {
                    "Date": "2013-12-21",
                    "Ledger": "Travel Expense, Nonlocal",
                    "Amount": "-8.1",
                    "Company": "BLACK TOP CABS VANCOUVER BC"
                }
            ]
        }"#;

        let page = decode_page(1, body).unwrap();

        assert_eq!(page.total_count, 38);
        assert_eq!(page.page, 1);
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.transactions[0].date, ymd_hms(2013, 12, 22, 0, 0, 0));
        assert_eq!(page.transactions[0].amount, Decimal::new(-11071, 2));
        assert_eq!(page.transactions[0].ledger, "Phone & Internet Expense");
        assert_eq!(page.transactions[1].company, "BLACK TOP CABS VANCOUVER BC");
    }

    #[test]
    fn test_decode_accepts_alternate_key_casing() {
        let body = br#"{
            "TotalCount": 1,
            "Page": 2,
            "Transactions": [{ "date": "2020-01-01", "amount": 5, "ledger": "L", "company": "C" }]
        }"#;

        let page = decode_page(2, body).unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.page, 2);
        assert_eq!(page.transactions[0].amount, Decimal::from(5));
        assert_eq!(page.transactions[0].ledger, "L");
    }

    #[rstest]
    #[case::upper(r#"{ "TOTALCOUNT": 1, "PAGE": 1, "TRANSACTIONS": [{ "DATE": "2020-01-01", "AMOUNT": 5, "LEDGER": "L", "COMPANY": "C" }] }"#)]
    #[case::lower(r#"{ "totalcount": 1, "page": 1, "transactions": [{ "date": "2020-01-01", "amount": 5, "ledger": "L", "company": "C" }] }"#)]
    #[case::snake(r#"{ "TOTAL_COUNT": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "aMoUnT": 5, "Ledger": "L", "Company": "C" }] }"#)]
    fn test_decode_key_case_is_ignored(#[case] body: &str) {
        let page = decode_page(1, body.as_bytes()).unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.transactions[0].date, ymd_hms(2020, 1, 1, 0, 0, 0));
        assert_eq!(page.transactions[0].amount, Decimal::from(5));
        assert_eq!(page.transactions[0].ledger, "L");
        assert_eq!(page.transactions[0].company, "C");
    }

    #[test]
    fn test_decode_skips_unknown_fields() {
        let body = br#"{ "totalCount": 1, "page": 1, "next": null, "transactions": [{ "Id": 9, "Date": "2020-01-01", "Amount": 2, "Tags": ["a"] }] }"#;

        let page = decode_page(1, body).unwrap();

        assert_eq!(page.transactions[0].amount, Decimal::from(2));
    }

    #[test]
    fn test_decode_defaults_optional_fields() {
        let body = br#"{ "totalCount": 0, "page": 1 }"#;
        let page = decode_page(1, body).unwrap();
        assert!(page.transactions.is_empty());

        let body = br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": 1 }] }"#;
        let page = decode_page(1, body).unwrap();
        assert_eq!(page.transactions[0].ledger, "");
        assert_eq!(page.transactions[0].company, "");

        let body = br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": 1, "Ledger": null, "Company": null }] }"#;
        let page = decode_page(1, body).unwrap();
        assert_eq!(page.transactions[0].ledger, "");
        assert_eq!(page.transactions[0].company, "");
    }

    #[rstest]
    #[case::string("\"-110.71\"", Decimal::new(-11071, 2))]
    #[case::padded_string("\"  42.5 \"", Decimal::new(425, 1))]
    #[case::integer("-18", Decimal::from(-18))]
    #[case::float("-18.2", Decimal::new(-182, 1))]
    #[case::large_integer("12345678901", Decimal::from(12_345_678_901i64))]
    #[case::scientific_string("\"1.5e2\"", Decimal::from(150))]
    #[case::zero("0", Decimal::ZERO)]
    #[case::scientific_number("1.5e2", Decimal::from(150))]
    #[case::many_digits("0.1234567890123456789", Decimal::from_str("0.1234567890123456789").unwrap())]
    #[case::large_fraction("123456789012.3456789", Decimal::from_str("123456789012.3456789").unwrap())]
    #[case::many_digits_string("\"-0.1234567890123456789\"", Decimal::from_str("-0.1234567890123456789").unwrap())]
    fn test_amount_forms(#[case] raw: &str, #[case] expected: Decimal) {
        let body = format!(
            r#"{{ "totalCount": 1, "page": 1, "transactions": [{{ "Date": "2020-01-01", "Amount": {} }}] }}"#,
            raw
        );

        let page = decode_page(1, body.as_bytes()).unwrap();

        assert_eq!(page.transactions[0].amount, expected);
    }

    #[rstest]
    #[case::date_only("2013-12-22", ymd_hms(2013, 12, 22, 0, 0, 0))]
    #[case::iso_datetime("2013-12-22T14:30:05", ymd_hms(2013, 12, 22, 14, 30, 5))]
    #[case::iso_fraction("2013-12-22T14:30:05.250", ymd_hms(2013, 12, 22, 14, 30, 5) + chrono::Duration::milliseconds(250))]
    #[case::space_separated("2013-12-22 23:59:59", ymd_hms(2013, 12, 22, 23, 59, 59))]
    #[case::rfc3339_offset("2013-12-22T23:30:00-08:00", ymd_hms(2013, 12, 22, 23, 30, 0))]
    #[case::rfc3339_utc("2013-12-22T01:00:00Z", ymd_hms(2013, 12, 22, 1, 0, 0))]
    #[case::us_date("12/22/2013", ymd_hms(2013, 12, 22, 0, 0, 0))]
    #[case::us_datetime("12/22/2013 08:15:00", ymd_hms(2013, 12, 22, 8, 15, 0))]
    fn test_date_forms(#[case] raw: &str, #[case] expected: NaiveDateTime) {
        assert_eq!(parse_date(raw), Some(expected));
    }

    #[rstest]
    #[case::not_json(b"not json".as_slice())]
    #[case::truncated(br#"{ "totalCount": 1, "page": 1, "transactions": ["#.as_slice())]
    #[case::missing_page(br#"{ "totalCount": 1 }"#.as_slice())]
    #[case::bad_amount(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": "abc" }] }"#.as_slice())]
    #[case::empty_amount(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": "" }] }"#.as_slice())]
    #[case::boolean_amount(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": true }] }"#.as_slice())]
    #[case::bad_date(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "yesterday", "Amount": 1 }] }"#.as_slice())]
    #[case::missing_date(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Amount": 1 }] }"#.as_slice())]
    #[case::missing_amount(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01" }] }"#.as_slice())]
    #[case::null_amount(br#"{ "totalCount": 1, "page": 1, "transactions": [{ "Date": "2020-01-01", "Amount": null }] }"#.as_slice())]
    #[case::missing_total(br#"{ "page": 1 }"#.as_slice())]
    fn test_malformed_pages_are_decode_errors(#[case] body: &[u8]) {
        let result = decode_page(7, body);
        assert!(
            matches!(result, Err(BalanceError::Decode { page: 7, .. })),
            "expected decode error, got {:?}",
            result
        );
    }

    #[test]
    fn test_decode_error_reports_position() {
        let body = b"{\n  \"totalCount\": 1,\n  \"page\": oops\n}";

        match decode_page(3, body) {
            Err(BalanceError::Decode { line, column, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 0);
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
