//! Error types for the settlement core
//!
//! This module defines every error the settlement core can surface to a caller.
//! Each variant carries enough context to produce a human-readable message, and
//! every variant maps onto one stable [`ErrorKind`] so that an outer transport
//! (HTTP, CLI, queue consumer) can translate it without matching on variants.
//!
//! # Error Categories
//!
//! - **Not found**: a referenced transaction, withdrawal, seller or listing is absent
//! - **Invalid input**: non-positive amounts, insufficient funds, illegal status transitions
//! - **Unauthorized**: the acting party does not own the record
//! - **Internal**: store or notifier failures, timeouts, arithmetic overflow

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Stable classification of a [`SettlementError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Unauthorized,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type for the settlement core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    /// Transaction not found in the ledger store
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// Withdrawal not found in the ledger store
    #[error("Withdrawal {id} not found")]
    WithdrawalNotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// Seller not found in the ledger store
    #[error("Seller {id} not found")]
    SellerNotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// Listing not found in the ledger store
    #[error("Listing {id} not found")]
    ListingNotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// Amount is zero, negative, or otherwise unusable for the operation
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that rejected it
        operation: String,
    },

    /// Seller balance does not cover the requested debit
    #[error(
        "Insufficient funds for seller {seller}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Seller identifier
        seller: String,
        /// Available balance at the time of the check
        available: Decimal,
        /// Requested debit
        requested: Decimal,
    },

    /// Status change not permitted by the transaction state machine
    #[error("Transaction {id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        /// Transaction identifier
        id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Withdrawal referenced with a seller that does not own it
    #[error("Withdrawal {withdrawal} belongs to seller {owner}, not {seller}")]
    SellerMismatch {
        /// Withdrawal identifier
        withdrawal: String,
        /// Seller recorded on the withdrawal
        owner: String,
        /// Seller supplied by the caller
        seller: String,
    },

    /// Acting party does not own the record it tried to change
    #[error("{actor} is not allowed to {operation} transaction {id}")]
    Unauthorized {
        /// Acting buyer or seller
        actor: String,
        /// Operation that was attempted
        operation: String,
        /// Transaction identifier
        id: String,
    },

    /// Ledger store reported a failure
    #[error("Store error during {operation}: {message}")]
    Store {
        /// Store operation that failed
        operation: String,
        /// Description supplied by the store
        message: String,
    },

    /// Notifier failed to deliver a message
    #[error("Notification to {recipient} failed: {message}")]
    Notifier {
        /// Recipient address
        recipient: String,
        /// Description supplied by the notifier
        message: String,
    },

    /// A bounded wait on a collaborator elapsed
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Bound in milliseconds
        after_ms: u64,
    },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for seller {seller}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Seller identifier
        seller: String,
    },
}

impl SettlementError {
    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::TransactionNotFound { .. }
            | SettlementError::WithdrawalNotFound { .. }
            | SettlementError::SellerNotFound { .. }
            | SettlementError::ListingNotFound { .. } => ErrorKind::NotFound,
            SettlementError::InvalidAmount { .. }
            | SettlementError::InsufficientFunds { .. }
            | SettlementError::InvalidTransition { .. }
            | SettlementError::SellerMismatch { .. } => ErrorKind::InvalidInput,
            SettlementError::Unauthorized { .. } => ErrorKind::Unauthorized,
            SettlementError::Store { .. }
            | SettlementError::Notifier { .. }
            | SettlementError::Timeout { .. }
            | SettlementError::ArithmeticOverflow { .. } => ErrorKind::Internal,
        }
    }
}

// Helper functions for creating common errors

impl SettlementError {
    /// Create a TransactionNotFound error
    pub fn transaction_not_found(id: impl fmt::Display) -> Self {
        SettlementError::TransactionNotFound { id: id.to_string() }
    }

    /// Create a WithdrawalNotFound error
    pub fn withdrawal_not_found(id: impl fmt::Display) -> Self {
        SettlementError::WithdrawalNotFound { id: id.to_string() }
    }

    /// Create a SellerNotFound error
    pub fn seller_not_found(id: &str) -> Self {
        SettlementError::SellerNotFound { id: id.to_string() }
    }

    /// Create a ListingNotFound error
    pub fn listing_not_found(id: &str) -> Self {
        SettlementError::ListingNotFound { id: id.to_string() }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        SettlementError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(seller: &str, available: Decimal, requested: Decimal) -> Self {
        SettlementError::InsufficientFunds {
            seller: seller.to_string(),
            available,
            requested,
        }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(
        id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        SettlementError::InvalidTransition {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a SellerMismatch error
    pub fn seller_mismatch(withdrawal: impl fmt::Display, owner: &str, seller: &str) -> Self {
        SettlementError::SellerMismatch {
            withdrawal: withdrawal.to_string(),
            owner: owner.to_string(),
            seller: seller.to_string(),
        }
    }

    /// Create an Unauthorized error
    pub fn unauthorized(actor: &str, operation: &str, id: impl fmt::Display) -> Self {
        SettlementError::Unauthorized {
            actor: actor.to_string(),
            operation: operation.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a Store error
    pub fn store(operation: &str, message: impl fmt::Display) -> Self {
        SettlementError::Store {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Notifier error
    pub fn notifier(recipient: &str, message: impl fmt::Display) -> Self {
        SettlementError::Notifier {
            recipient: recipient.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Timeout error
    pub fn timeout(operation: &str, after_ms: u64) -> Self {
        SettlementError::Timeout {
            operation: operation.to_string(),
            after_ms,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, seller: &str) -> Self {
        SettlementError::ArithmeticOverflow {
            operation: operation.to_string(),
            seller: seller.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transaction_not_found(
        SettlementError::transaction_not_found("t-1"),
        "Transaction t-1 not found"
    )]
    #[case::seller_not_found(SettlementError::seller_not_found("A"), "Seller A not found")]
    #[case::invalid_amount(
        SettlementError::invalid_amount(Decimal::ZERO, "withdrawal"),
        "Invalid amount 0 for withdrawal"
    )]
    #[case::insufficient_funds(
        SettlementError::insufficient_funds("A", Decimal::new(5000, 2), Decimal::new(10000, 2)),
        "Insufficient funds for seller A: available 50.00, requested 100.00"
    )]
    #[case::invalid_transition(
        SettlementError::invalid_transition("t-1", "Completed", "Processing"),
        "Transaction t-1 cannot move from 'Completed' to 'Processing'"
    )]
    #[case::unauthorized(
        SettlementError::unauthorized("B", "update", "t-1"),
        "B is not allowed to update transaction t-1"
    )]
    #[case::timeout(
        SettlementError::timeout("find_seller", 250),
        "find_seller timed out after 250ms"
    )]
    fn test_error_display(#[case] error: SettlementError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::withdrawal_not_found(SettlementError::withdrawal_not_found("w"), ErrorKind::NotFound)]
    #[case::listing_not_found(SettlementError::listing_not_found("L"), ErrorKind::NotFound)]
    #[case::seller_mismatch(
        SettlementError::seller_mismatch("w", "A", "B"),
        ErrorKind::InvalidInput
    )]
    #[case::insufficient(
        SettlementError::insufficient_funds("A", Decimal::ZERO, Decimal::ONE),
        ErrorKind::InvalidInput
    )]
    #[case::unauthorized(SettlementError::unauthorized("B", "refund", "t"), ErrorKind::Unauthorized)]
    #[case::store(SettlementError::store("save", "disk full"), ErrorKind::Internal)]
    #[case::notifier(SettlementError::notifier("a@b.c", "smtp down"), ErrorKind::Internal)]
    #[case::overflow(SettlementError::arithmetic_overflow("credit", "A"), ErrorKind::Internal)]
    fn test_error_kind(#[case] error: SettlementError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
    }
}
