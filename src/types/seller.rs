//! Seller-related types for the settlement core
//!
//! A seller (called agent or property elsewhere in the marketplace) owns the
//! listings being sold and receives payouts. The settlement core only touches
//! the balance fields and the payout history; profile data belongs to the
//! external store.

use super::error::SettlementError;
use super::transaction::SellerId;
use super::withdrawal::{WithdrawalId, WithdrawalStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Entry of a seller's payout history
///
/// Appended once per confirmed withdrawal; the id is the withdrawal id, which
/// keeps the append idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutEntry {
    pub id: WithdrawalId,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
    pub status: WithdrawalStatus,
}

/// Seller ledger state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: SellerId,

    /// Display name used in notifications
    pub name: String,

    /// Notification address
    pub email: String,

    /// Funds eligible for withdrawal
    ///
    /// Credited when a transaction completes, debited when a withdrawal is
    /// requested.
    pub available_balance: Decimal,

    /// Append-only payout history
    pub transactions: Vec<PayoutEntry>,
}

impl Seller {
    /// Create a seller with a zero balance and empty history
    pub fn new(id: impl Into<SellerId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Seller {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            available_balance: Decimal::ZERO,
            transactions: Vec::new(),
        }
    }

    /// Total amount paid out so far
    pub fn withdrawn(&self) -> Decimal {
        self.transactions.iter().map(|entry| entry.amount).sum()
    }
}

/// Atomic change applied to a seller's available balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAdjustment {
    /// Add funds
    Credit(Decimal),

    /// Remove funds; rejected when the balance does not cover the amount
    Debit(Decimal),
}

impl BalanceAdjustment {
    /// Apply the adjustment to a balance using checked arithmetic
    pub fn apply(&self, seller: &str, balance: Decimal) -> Result<Decimal, SettlementError> {
        match *self {
            BalanceAdjustment::Credit(amount) => balance
                .checked_add(amount)
                .ok_or_else(|| SettlementError::arithmetic_overflow("credit", seller)),
            BalanceAdjustment::Debit(amount) => {
                if balance < amount {
                    return Err(SettlementError::insufficient_funds(seller, balance, amount));
                }
                balance
                    .checked_sub(amount)
                    .ok_or_else(|| SettlementError::arithmetic_overflow("debit", seller))
            }
        }
    }
}
