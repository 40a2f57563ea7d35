//! Transaction-related types for the settlement core
//!
//! This module defines the per-seller order record ([`Transaction`]), its cart
//! lines, and the status state machine that drives stock and balance effects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transaction identifier
pub type TransactionId = Uuid;

/// Seller (agent / property) identifier, compared by exact string equality
pub type SellerId = String;

/// Buyer identifier
pub type BuyerId = String;

/// Listing (product) identifier
pub type ListingId = String;

/// Status of a transaction
///
/// ```text
/// Processing ──► Transferred to delivery partner ──► Completed
///     │                        │                        │
///     └──────────────┬─────────┴────────────────────────┘
///                    ▼
///            Refund Requested ──► Refund Success
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Initial status of every created transaction
    Processing,

    /// Seller handed the goods over; stock is decremented
    #[serde(rename = "Transferred to delivery partner")]
    TransferredToDeliveryPartner,

    /// Delivered and settled; the seller has been credited
    Completed,

    /// Buyer asked for a refund
    #[serde(rename = "Refund Requested")]
    RefundRequested,

    /// Seller accepted the refund; stock is restored
    #[serde(rename = "Refund Success")]
    RefundSuccess,
}

impl TransactionStatus {
    /// Human-readable status label, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Processing => "Processing",
            TransactionStatus::TransferredToDeliveryPartner => "Transferred to delivery partner",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::RefundRequested => "Refund Requested",
            TransactionStatus::RefundSuccess => "Refund Success",
        }
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Processing, TransferredToDeliveryPartner)
                | (Processing | TransferredToDeliveryPartner, Completed)
                | (
                    Processing | TransferredToDeliveryPartner | Completed,
                    RefundRequested
                )
                | (RefundRequested, RefundSuccess)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status carried inside [`PaymentInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

/// Payment details shared by every transaction split from one checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub status: PaymentStatus,
    /// Payment method label, e.g. "card" or "mpesa"
    pub method: String,
    /// Provider reference, when the payment gateway issued one
    pub reference: Option<String>,
}

/// Shipping / billing address, opaque to the settlement core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub country: String,
    pub zip_code: Option<String>,
}

/// Reference to the buyer who placed the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: BuyerId,
    pub name: String,
    pub email: String,
}

/// One line of a shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Listing being bought
    pub listing_id: ListingId,

    /// Seller that owns the listing; the cart splitting key
    #[serde(rename = "agentId")]
    pub seller_id: SellerId,

    /// Quantity ordered
    pub qty: u32,

    /// Set by the review flow once the buyer has reviewed the item
    #[serde(default)]
    pub is_reviewed: bool,
}

impl CartItem {
    /// Create an unreviewed cart line
    pub fn new(listing_id: impl Into<ListingId>, seller_id: impl Into<SellerId>, qty: u32) -> Self {
        CartItem {
            listing_id: listing_id.into(),
            seller_id: seller_id.into(),
            qty,
            is_reviewed: false,
        }
    }
}

/// Amounts recorded when a transaction completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// Platform fee deducted from the total
    pub service_charge: Decimal,

    /// Amount credited to the seller's available balance
    pub seller_credit: Decimal,
}

/// Per-seller order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,

    /// Items of a single seller, in the order the buyer added them
    pub cart: Vec<CartItem>,

    pub billing_address: BillingAddress,

    #[serde(rename = "user")]
    pub buyer: Buyer,

    /// Total of the originating checkout (not re-split per seller)
    pub total_price: Decimal,

    pub payment_info: PaymentInfo,

    pub status: TransactionStatus,

    pub created_at: DateTime<Utc>,

    /// Set when the transaction reaches `Completed`
    pub completed_at: Option<DateTime<Utc>>,

    /// Set together with `completed_at`
    pub settlement: Option<Settlement>,
}

impl Transaction {
    /// Seller owning every item of this transaction
    ///
    /// `None` only for a transaction with an empty cart, which the cart
    /// splitter never produces.
    pub fn seller_id(&self) -> Option<&str> {
        self.cart.first().map(|item| item.seller_id.as_str())
    }
}

/// Data needed to persist a new transaction
///
/// Produced by the cart splitter; the store assigns the id and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub seller_id: SellerId,
    pub cart: Vec<CartItem>,
    pub billing_address: BillingAddress,
    pub buyer: Buyer,
    pub total_price: Decimal,
    pub payment_info: PaymentInfo,
}
