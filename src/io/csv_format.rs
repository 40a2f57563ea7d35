//! CSV format handling for replay scripts and seller output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to replay operations
//! - Seller output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{ListingId, Seller, SellerId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, ref, party, listing, qty, amount.
/// Which columns are required depends on the operation type.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub party: Option<String>,
    pub listing: Option<String>,
    pub qty: Option<String>,
    pub amount: Option<String>,
}

/// Seller-driven or buyer-driven step applied to one seller's part of a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Ship,
    Complete,
    RefundRequest,
    Refund,
}

/// One step of a replay script
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOp {
    /// Register a seller with an opening balance
    Seller { seller: SellerId, balance: Decimal },
    /// Register a listing with its stock
    Listing {
        seller: SellerId,
        listing: ListingId,
        stock: i64,
    },
    /// Add a line to a pending checkout
    Item {
        checkout: String,
        seller: SellerId,
        listing: ListingId,
        qty: u32,
    },
    /// Submit a pending checkout
    Checkout {
        checkout: String,
        buyer: String,
        total: Decimal,
    },
    /// Move one seller's transaction of a checkout
    Transition {
        checkout: String,
        seller: SellerId,
        action: TransitionAction,
    },
    /// Request a payout
    Withdraw {
        reference: String,
        seller: SellerId,
        amount: Decimal,
    },
    /// Confirm a payout
    Confirm { reference: String, seller: SellerId },
}

fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required<'a>(field: &'a Option<String>, name: &str, op: &str) -> Result<&'a str, String> {
    present(field).ok_or_else(|| format!("'{}' operation requires a {} column", op, name))
}

fn parse_decimal(field: &Option<String>, name: &str, op: &str) -> Result<Decimal, String> {
    let raw = required(field, name, op)?;
    Decimal::from_str(raw).map_err(|_| format!("Invalid {} '{}' for '{}' operation", name, raw, op))
}

fn parse_integer<T: FromStr>(field: &Option<String>, name: &str, op: &str) -> Result<T, String> {
    let raw = required(field, name, op)?;
    raw.parse::<T>()
        .map_err(|_| format!("Invalid {} '{}' for '{}' operation", name, raw, op))
}

/// Convert a CsvRecord to a ReplayOp
///
/// Operation names are case-insensitive. Columns an operation does not use
/// are ignored.
///
/// # Returns
///
/// Result containing either:
/// - Ok(ReplayOp) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<ReplayOp, String> {
    let op = csv_record.op_type.trim().to_lowercase();
    let op = op.as_str();

    let transition = |action| -> Result<ReplayOp, String> {
        Ok(ReplayOp::Transition {
            checkout: required(&csv_record.reference, "ref", op)?.to_string(),
            seller: required(&csv_record.party, "party", op)?.to_string(),
            action,
        })
    };

    match op {
        "seller" => Ok(ReplayOp::Seller {
            seller: required(&csv_record.party, "party", op)?.to_string(),
            balance: match present(&csv_record.amount) {
                Some(_) => parse_decimal(&csv_record.amount, "amount", op)?,
                None => Decimal::ZERO,
            },
        }),
        "listing" => Ok(ReplayOp::Listing {
            seller: required(&csv_record.party, "party", op)?.to_string(),
            listing: required(&csv_record.listing, "listing", op)?.to_string(),
            stock: parse_integer(&csv_record.qty, "qty", op)?,
        }),
        "item" => Ok(ReplayOp::Item {
            checkout: required(&csv_record.reference, "ref", op)?.to_string(),
            seller: required(&csv_record.party, "party", op)?.to_string(),
            listing: required(&csv_record.listing, "listing", op)?.to_string(),
            qty: parse_integer(&csv_record.qty, "qty", op)?,
        }),
        "checkout" => Ok(ReplayOp::Checkout {
            checkout: required(&csv_record.reference, "ref", op)?.to_string(),
            buyer: required(&csv_record.party, "party", op)?.to_string(),
            total: parse_decimal(&csv_record.amount, "amount", op)?,
        }),
        "ship" => transition(TransitionAction::Ship),
        "complete" => transition(TransitionAction::Complete),
        "refund_request" => transition(TransitionAction::RefundRequest),
        "refund" => transition(TransitionAction::Refund),
        "withdraw" => Ok(ReplayOp::Withdraw {
            reference: required(&csv_record.reference, "ref", op)?.to_string(),
            seller: required(&csv_record.party, "party", op)?.to_string(),
            amount: parse_decimal(&csv_record.amount, "amount", op)?,
        }),
        "confirm" => Ok(ReplayOp::Confirm {
            reference: required(&csv_record.reference, "ref", op)?.to_string(),
            seller: required(&csv_record.party, "party", op)?.to_string(),
        }),
        _ => Err(format!("Invalid operation type: '{}'", csv_record.op_type)),
    }
}

/// Write seller states to CSV format
///
/// Writes sellers in CSV format with columns: seller, available, withdrawn, payouts.
/// Sellers are sorted by id for deterministic output.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_sellers_csv(sellers: &[Seller], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["seller", "available", "withdrawn", "payouts"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_sellers = sellers.to_vec();
    sorted_sellers.sort_by(|a, b| a.id.cmp(&b.id));

    for seller in sorted_sellers {
        writer
            .write_record(&[
                seller.id.clone(),
                format!("{:.2}", seller.available_balance),
                format!("{:.2}", seller.withdrawn()),
                seller.transactions.len().to_string(),
            ])
            .map_err(|e| format!("Failed to write seller {}: {}", seller.id, e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush CSV writer: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(op: &str, reference: &str, party: &str, listing: &str, qty: &str, amount: &str) -> CsvRecord {
        let field = |value: &str| (!value.is_empty()).then(|| value.to_string());
        CsvRecord {
            op_type: op.to_string(),
            reference: field(reference),
            party: field(party),
            listing: field(listing),
            qty: field(qty),
            amount: field(amount),
        }
    }

    #[rstest]
    #[case::seller(
        record("seller", "", "A", "", "", "100.50"),
        ReplayOp::Seller { seller: "A".into(), balance: Decimal::new(10050, 2) }
    )]
    #[case::seller_without_balance(
        record("seller", "", "A", "", "", ""),
        ReplayOp::Seller { seller: "A".into(), balance: Decimal::ZERO }
    )]
    #[case::listing(
        record("listing", "", "A", "L1", "10", ""),
        ReplayOp::Listing { seller: "A".into(), listing: "L1".into(), stock: 10 }
    )]
    #[case::item(
        record("item", "o1", "A", "L1", "2", ""),
        ReplayOp::Item { checkout: "o1".into(), seller: "A".into(), listing: "L1".into(), qty: 2 }
    )]
    #[case::checkout(
        record("checkout", "o1", "u1", "", "", "100"),
        ReplayOp::Checkout { checkout: "o1".into(), buyer: "u1".into(), total: Decimal::new(100, 0) }
    )]
    #[case::ship_uppercase(
        record("SHIP", "o1", "A", "", "", ""),
        ReplayOp::Transition { checkout: "o1".into(), seller: "A".into(), action: TransitionAction::Ship }
    )]
    #[case::refund_request(
        record("refund_request", "o1", "A", "", "", ""),
        ReplayOp::Transition { checkout: "o1".into(), seller: "A".into(), action: TransitionAction::RefundRequest }
    )]
    #[case::withdraw(
        record("withdraw", "w1", "A", "", "", "50"),
        ReplayOp::Withdraw { reference: "w1".into(), seller: "A".into(), amount: Decimal::new(50, 0) }
    )]
    #[case::confirm(
        record("confirm", "w1", "A", "", "", ""),
        ReplayOp::Confirm { reference: "w1".into(), seller: "A".into() }
    )]
    fn test_convert_valid_records(#[case] input: CsvRecord, #[case] expected: ReplayOp) {
        assert_eq!(convert_csv_record(input), Ok(expected));
    }

    #[rstest]
    #[case::unknown_type(record("teleport", "o1", "A", "", "", ""), "Invalid operation type")]
    #[case::missing_party(record("ship", "o1", "", "", "", ""), "requires a party column")]
    #[case::bad_qty(record("item", "o1", "A", "L1", "two", ""), "Invalid qty 'two'")]
    #[case::negative_qty(record("item", "o1", "A", "L1", "-1", ""), "Invalid qty '-1'")]
    #[case::bad_amount(record("withdraw", "w1", "A", "", "", "lots"), "Invalid amount 'lots'")]
    #[case::missing_total(record("checkout", "o1", "u1", "", "", ""), "requires a amount column")]
    fn test_convert_invalid_records(#[case] input: CsvRecord, #[case] message: &str) {
        let error = convert_csv_record(input).unwrap_err();
        assert!(error.contains(message), "unexpected error: {}", error);
    }

    #[test]
    fn test_write_sellers_csv_sorted_with_two_decimals() {
        let mut b = Seller::new("B", "B", "b@example.com");
        b.available_balance = Decimal::new(90, 0);
        let a = Seller::new("A", "A", "a@example.com");

        let mut output = Vec::new();
        write_sellers_csv(&[b, a], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "seller,available,withdrawn,payouts\nA,0.00,0.00,0\nB,90.00,0.00,0\n"
        );
    }
}
