//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use marketplace_settlement::core::traits::{LedgerStore, TransactionQuery, TransactionSort};
use marketplace_settlement::types::{
    BalanceAdjustment, BillingAddress, Buyer, CartItem, Listing, NewTransaction, NewWithdrawal,
    PaymentInfo, PayoutEntry, Seller, SettlementError, StockAdjustment, Transaction,
    TransactionId, Withdrawal, WithdrawalId,
};
use marketplace_settlement::{
    CheckoutRequest, InMemoryLedgerStore, OutboxNotifier, SettlementConfig,
    TransactionLifecycleManager, WithdrawalLifecycleManager,
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long a stalled operation hangs after writing
pub const STALL: Duration = Duration::from_millis(300);

/// In-memory store with switchable failures
///
/// Wraps [`InMemoryLedgerStore`]. A failing operation returns a store error
/// without touching the inner state; a stalled one applies its write and then
/// hangs for [`STALL`], so a caller with a shorter timeout sees a failure for
/// a write that did land.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryLedgerStore,
    failing: Mutex<HashSet<&'static str>>,
    stalled: Mutex<HashSet<&'static str>>,
    /// Remaining failures of `adjust_listing_stock` before it recovers
    pub stock_failures: AtomicU32,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn stall(&self, operation: &'static str) {
        self.stalled.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
        self.stalled.lock().unwrap().remove(operation);
    }

    async fn after_write(&self, operation: &'static str) {
        let stalled = self.stalled.lock().unwrap().contains(operation);
        if stalled {
            tokio::time::sleep(STALL).await;
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), SettlementError> {
        if self.failing.lock().unwrap().contains(operation) {
            Err(SettlementError::store(operation, "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, SettlementError> {
        self.check("find_transaction")?;
        self.inner.find_transaction(id).await
    }

    async fn create_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, SettlementError> {
        self.check("create_transaction")?;
        self.inner.create_transaction(transaction).await
    }

    async fn save_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, SettlementError> {
        self.check("save_transaction")?;
        self.inner.save_transaction(transaction).await
    }

    async fn find_transactions(
        &self,
        query: TransactionQuery,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>, SettlementError> {
        self.check("find_transactions")?;
        self.inner.find_transactions(query, sort).await
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<Withdrawal>, SettlementError> {
        self.check("find_withdrawal")?;
        self.inner.find_withdrawal(id).await
    }

    async fn create_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> Result<Withdrawal, SettlementError> {
        self.check("create_withdrawal")?;
        let created = self.inner.create_withdrawal(withdrawal).await;
        self.after_write("create_withdrawal").await;
        created
    }

    async fn save_withdrawal(
        &self,
        withdrawal: &Withdrawal,
    ) -> Result<Withdrawal, SettlementError> {
        self.check("save_withdrawal")?;
        self.inner.save_withdrawal(withdrawal).await
    }

    async fn find_withdrawals(&self) -> Result<Vec<Withdrawal>, SettlementError> {
        self.check("find_withdrawals")?;
        self.inner.find_withdrawals().await
    }

    async fn find_seller(&self, id: &str) -> Result<Option<Seller>, SettlementError> {
        self.check("find_seller")?;
        self.inner.find_seller(id).await
    }

    async fn adjust_seller_balance(
        &self,
        id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<Seller, SettlementError> {
        self.check("adjust_seller_balance")?;
        self.inner.adjust_seller_balance(id, adjustment).await
    }

    async fn credit_sale(
        &self,
        id: &str,
        transaction: TransactionId,
        amount: Decimal,
    ) -> Result<Seller, SettlementError> {
        self.check("credit_sale")?;
        let credited = self.inner.credit_sale(id, transaction, amount).await;
        self.after_write("credit_sale").await;
        credited
    }

    async fn append_payout(&self, id: &str, entry: PayoutEntry) -> Result<Seller, SettlementError> {
        self.check("append_payout")?;
        self.inner.append_payout(id, entry).await
    }

    async fn find_listing(&self, id: &str) -> Result<Option<Listing>, SettlementError> {
        self.check("find_listing")?;
        self.inner.find_listing(id).await
    }

    async fn adjust_listing_stock(
        &self,
        id: &str,
        adjustment: StockAdjustment,
    ) -> Result<Listing, SettlementError> {
        self.check("adjust_listing_stock")?;
        let remaining = self.stock_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.stock_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SettlementError::store("adjust_listing_stock", "transient failure"));
        }
        self.inner.adjust_listing_stock(id, adjustment).await
    }
}

/// Configuration with short waits so failure paths finish quickly
pub fn fast_config() -> SettlementConfig {
    SettlementConfig {
        restock_backoff: Duration::from_millis(1),
        ..SettlementConfig::default()
    }
}

/// Store timeout well below [`STALL`]
pub fn impatient_config() -> SettlementConfig {
    SettlementConfig {
        store_timeout: Duration::from_millis(30),
        ..fast_config()
    }
}

pub fn seller(id: &str, balance: i64) -> Seller {
    let email = format!("{}@example.com", id.to_lowercase());
    let mut seller = Seller::new(id, format!("Seller {}", id), email);
    seller.available_balance = Decimal::new(balance, 0);
    seller
}

pub fn checkout(buyer: &str, total: i64, cart: Vec<CartItem>) -> CheckoutRequest {
    CheckoutRequest {
        cart,
        billing_address: BillingAddress {
            address1: "5 Harbour Road".into(),
            city: "Mombasa".into(),
            country: "KE".into(),
            zip_code: Some("80100".into()),
            ..BillingAddress::default()
        },
        buyer: Buyer {
            id: buyer.into(),
            name: format!("Buyer {}", buyer),
            email: format!("{}@example.com", buyer),
        },
        total_price: Decimal::new(total, 0),
        payment_info: PaymentInfo {
            method: "card".into(),
            ..PaymentInfo::default()
        },
    }
}

/// Managers wired to one store and one outbox
pub struct Harness<S: LedgerStore + 'static> {
    pub store: Arc<S>,
    pub outbox: Arc<OutboxNotifier>,
    pub transactions: Arc<TransactionLifecycleManager>,
    pub withdrawals: Arc<WithdrawalLifecycleManager>,
}

impl<S: LedgerStore + 'static> Harness<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, fast_config())
    }

    pub fn with_config(store: S, config: SettlementConfig) -> Self {
        let store = Arc::new(store);
        let outbox = Arc::new(OutboxNotifier::new());
        Self {
            transactions: Arc::new(TransactionLifecycleManager::new(store.clone(), config.clone())),
            withdrawals: Arc::new(WithdrawalLifecycleManager::new(
                store.clone(),
                outbox.clone(),
                config,
            )),
            store,
            outbox,
        }
    }

    pub async fn balance(&self, seller: &str) -> Decimal {
        self.store
            .find_seller(seller)
            .await
            .unwrap()
            .unwrap()
            .available_balance
    }

    pub async fn listing(&self, id: &str) -> Listing {
        self.store.find_listing(id).await.unwrap().unwrap()
    }
}
