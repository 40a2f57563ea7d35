//! Collaborator traits consumed by the settlement core
//!
//! The ledger store and the notifier live outside the core. Both are expressed
//! as object-safe async traits so that a document database, an SMTP client or a
//! test fake can be injected behind an `Arc<dyn ...>`.

use crate::types::{
    BalanceAdjustment, BuyerId, Listing, NewTransaction, NewWithdrawal, PayoutEntry, Seller,
    SellerId, SettlementError, StockAdjustment, Transaction, TransactionId, Withdrawal,
    WithdrawalId,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Filter for [`LedgerStore::find_transactions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionQuery {
    /// Every transaction (admin view)
    All,
    /// Transactions placed by one buyer
    ByBuyer(BuyerId),
    /// Transactions containing items of one seller
    BySeller(SellerId),
}

impl TransactionQuery {
    /// Whether `transaction` matches this filter
    pub fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            TransactionQuery::All => true,
            TransactionQuery::ByBuyer(buyer) => transaction.buyer.id == *buyer,
            TransactionQuery::BySeller(seller) => {
                transaction.cart.iter().any(|item| item.seller_id == *seller)
            }
        }
    }
}

/// Ordering for [`LedgerStore::find_transactions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSort {
    /// Newest first
    CreatedDesc,
    /// Most recently completed first, never-completed last, then newest first
    CompletedThenCreatedDesc,
}

/// Persistent record of transactions, withdrawals, listings and seller balances
///
/// Every method is a single store round trip. Balance, payout and stock
/// changes are expressed as atomic primitives so that the store, not the
/// caller, serializes concurrent mutations of the same record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Get a transaction by id
    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, SettlementError>;

    /// Persist a new transaction in `Processing`
    async fn create_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, SettlementError>;

    /// Replace a stored transaction with `transaction`
    async fn save_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, SettlementError>;

    /// Query transactions
    async fn find_transactions(
        &self,
        query: TransactionQuery,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>, SettlementError>;

    /// Get a withdrawal by id
    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<Withdrawal>, SettlementError>;

    /// Persist a new withdrawal in `Processing` under the caller-chosen id
    ///
    /// Creating an id that already exists returns the stored record.
    async fn create_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> Result<Withdrawal, SettlementError>;

    /// Replace a stored withdrawal with `withdrawal`
    async fn save_withdrawal(&self, withdrawal: &Withdrawal)
        -> Result<Withdrawal, SettlementError>;

    /// All withdrawals, newest first
    async fn find_withdrawals(&self) -> Result<Vec<Withdrawal>, SettlementError>;

    /// Get a seller by id
    async fn find_seller(&self, id: &str) -> Result<Option<Seller>, SettlementError>;

    /// Atomically apply `adjustment` to the seller's available balance
    ///
    /// A debit that the balance does not cover fails with
    /// [`SettlementError::InsufficientFunds`] and leaves the balance unchanged.
    async fn adjust_seller_balance(
        &self,
        id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<Seller, SettlementError>;

    /// Atomically credit the seller with the proceeds of `transaction`
    ///
    /// At most one credit is ever applied per transaction: a repeated call
    /// (e.g. after a timed-out first attempt that did land) leaves the balance
    /// unchanged and returns the current seller.
    async fn credit_sale(
        &self,
        id: &str,
        transaction: TransactionId,
        amount: Decimal,
    ) -> Result<Seller, SettlementError>;

    /// Atomically append `entry` to the seller's payout history
    ///
    /// Appending an entry whose id is already present is a no-op.
    async fn append_payout(&self, id: &str, entry: PayoutEntry)
        -> Result<Seller, SettlementError>;

    /// Get a listing by id
    async fn find_listing(&self, id: &str) -> Result<Option<Listing>, SettlementError>;

    /// Atomically apply `adjustment` to the listing's counters
    async fn adjust_listing_stock(
        &self,
        id: &str,
        adjustment: StockAdjustment,
    ) -> Result<Listing, SettlementError>;
}

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers notifications to sellers
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message
    async fn send(&self, notification: Notification) -> Result<(), SettlementError>;
}
