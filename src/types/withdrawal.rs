//! Withdrawal-related types for the settlement core

use super::transaction::SellerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Withdrawal identifier
pub type WithdrawalId = Uuid;

/// Status of a withdrawal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Funds reserved, waiting for admin confirmation
    Processing,

    /// Payout confirmed by an admin
    #[serde(rename = "succeed")]
    Succeed,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalStatus::Processing => f.write_str("Processing"),
            WithdrawalStatus::Succeed => f.write_str("succeed"),
        }
    }
}

/// Seller-initiated payout request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub seller_id: SellerId,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to persist a new withdrawal
///
/// The id is chosen before anything is written, so a caller whose create call
/// failed can still look the record up and learn whether it landed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub id: WithdrawalId,
    pub seller_id: SellerId,
    pub amount: Decimal,
}

impl NewWithdrawal {
    /// New request with a fresh id
    pub fn new(seller_id: impl Into<SellerId>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id: seller_id.into(),
            amount,
        }
    }
}
