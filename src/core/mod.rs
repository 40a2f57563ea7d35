//! Core business logic module
//!
//! This module contains the settlement components:
//! - `traits` - Collaborator interfaces (ledger store, notifier)
//! - `cart_splitter` - Per-seller grouping of a checkout
//! - `transaction_manager` - Transaction state machine and its side effects
//! - `withdrawal_manager` - Payout requests and confirmations
//! - `keyed_locks`, `background`, `bounded` - Concurrency plumbing shared by the managers

pub mod background;
pub mod bounded;
pub mod cart_splitter;
pub mod keyed_locks;
pub mod traits;
pub mod transaction_manager;
pub mod withdrawal_manager;

pub use cart_splitter::{split_cart, CheckoutRequest};
pub use keyed_locks::{KeyedGuard, KeyedLocks};
pub use traits::{LedgerStore, Notification, Notifier, TransactionQuery, TransactionSort};
pub use transaction_manager::TransactionLifecycleManager;
pub use withdrawal_manager::{PayoutConfirmation, WithdrawalLifecycleManager};
