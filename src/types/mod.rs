//! Types module
//!
//! Contains the domain records the settlement core reads and writes.
//! This module organizes types into logical submodules:
//! - `transaction`: per-seller orders, cart lines and the status state machine
//! - `withdrawal`: payout requests
//! - `seller`: seller balance and payout history
//! - `listing`: inventory counters
//! - `error`: error types for the settlement core

pub mod error;
pub mod listing;
pub mod seller;
pub mod transaction;
pub mod withdrawal;

pub use error::{ErrorKind, SettlementError};
pub use listing::{Listing, StockAdjustment};
pub use seller::{BalanceAdjustment, PayoutEntry, Seller};
pub use transaction::{
    BillingAddress, Buyer, BuyerId, CartItem, ListingId, NewTransaction, PaymentInfo,
    PaymentStatus, SellerId, Settlement, Transaction, TransactionId, TransactionStatus,
};
pub use withdrawal::{NewWithdrawal, Withdrawal, WithdrawalId, WithdrawalStatus};
