//! Marketplace Settlement Library
//! # Overview
//!
//! Settlement core of a multi-seller marketplace: a buyer's cart is split into
//! one transaction per seller, each transaction moves through its fulfilment
//! state machine, completed sales credit the seller minus the platform's
//! service charge, and sellers withdraw their balance through an
//! admin-confirmed payout flow.
//!
//! # Architecture
//!
//! - [`types`] - Domain records (Transaction, Withdrawal, Seller, Listing) and errors
//! - [`config`] - Service charge rate, bounded waits, restock retry policy
//! - [`core`] - Business logic components:
//!   - [`core::cart_splitter`] - Per-seller grouping of a checkout
//!   - [`core::transaction_manager`] - Transaction state machine and side effects
//!   - [`core::withdrawal_manager`] - Payout requests and confirmations
//!   - [`core::traits`] - `LedgerStore` and `Notifier` collaborator interfaces
//! - [`store`] - In-memory `LedgerStore`
//! - [`notify`] - Notification templates and `Notifier` implementations
//! - [`io`] - Replay script parsing and seller output
//! - [`replay`] - Script interpreter behind the CLI
//! - [`cli`] - CLI arguments parsing
//!
//! # Transaction States
//!
//! - **Processing**: created at checkout
//! - **Transferred to delivery partner**: listing stock decremented, sold count incremented
//! - **Completed**: payment succeeded, seller credited with total minus service charge
//! - **Refund Requested**: buyer asked for a refund
//! - **Refund Success**: listing stock restored in the background; terminal
//!
//! # Seller Balances
//!
//! Each seller maintains:
//! - `available_balance`: credited on completion, debited when a withdrawal is requested
//! - `transactions`: append-only payout history, one entry per confirmed withdrawal

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod notify;
pub mod replay;
pub mod store;
pub mod types;

pub use config::SettlementConfig;
pub use crate::core::{
    split_cart, CheckoutRequest, LedgerStore, Notification, Notifier, PayoutConfirmation,
    TransactionLifecycleManager, TransactionQuery, TransactionSort, WithdrawalLifecycleManager,
};
pub use io::write_sellers_csv;
pub use notify::{OutboxNotifier, TracingNotifier};
pub use replay::{Replay, ReplayRunner};
pub use store::InMemoryLedgerStore;
pub use types::{
    BalanceAdjustment, BillingAddress, Buyer, CartItem, ErrorKind, Listing, NewTransaction,
    NewWithdrawal, PaymentInfo, PaymentStatus, PayoutEntry, Seller, SettlementError,
    StockAdjustment, Transaction, TransactionId, TransactionStatus, Withdrawal, WithdrawalId,
    WithdrawalStatus,
};
