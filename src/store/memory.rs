//! Thread-safe in-memory ledger store
//!
//! This module provides [`InMemoryLedgerStore`], a [`LedgerStore`] backed by
//! one `DashMap` per collection. It backs the replay CLI and the test suite,
//! and can be embedded wherever a process-local ledger is enough.
//!
//! # Thread Safety
//!
//! Every atomic primitive of the trait (balance adjustment, payout append,
//! stock adjustment) runs while holding the entry guard of the record it
//! mutates. Concurrent adjustments of the same seller are therefore serialized
//! and no update is lost, while different sellers proceed in parallel.
//!
//! # Ordering
//!
//! Records carry an insertion sequence number in addition to their timestamp,
//! so that "newest first" stays deterministic for records created within the
//! same clock tick.

use crate::core::traits::{LedgerStore, TransactionQuery, TransactionSort};
use crate::types::{
    BalanceAdjustment, Listing, NewTransaction, NewWithdrawal, PayoutEntry, Seller,
    SettlementError, StockAdjustment, Transaction, TransactionId, TransactionStatus, Withdrawal,
    WithdrawalId, WithdrawalStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use dashmap::{DashMap, DashSet};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Record wrapper keeping the insertion order
#[derive(Debug, Clone)]
struct Sequenced<T> {
    seq: u64,
    record: T,
}

/// DashMap-backed ledger store
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    transactions: DashMap<TransactionId, Sequenced<Transaction>>,
    withdrawals: DashMap<WithdrawalId, Sequenced<Withdrawal>>,
    sellers: DashMap<String, Seller>,
    listings: DashMap<String, Listing>,
    /// Transactions whose sale proceeds were already credited
    credited_sales: DashSet<TransactionId>,
    sequence: AtomicU64,
}

impl InMemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Register or replace a seller
    pub fn insert_seller(&self, seller: Seller) {
        self.sellers.insert(seller.id.clone(), seller);
    }

    /// Register or replace a listing
    pub fn insert_listing(&self, listing: Listing) {
        self.listings.insert(listing.id.clone(), listing);
    }

    /// Snapshot of every seller, sorted by id
    pub fn sellers(&self) -> Vec<Seller> {
        let mut sellers: Vec<Seller> = self
            .sellers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sellers.sort_by(|a, b| a.id.cmp(&b.id));
        sellers
    }

    /// Snapshot of every listing, sorted by id
    pub fn listings(&self) -> Vec<Listing> {
        let mut listings: Vec<Listing> = self
            .listings
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        listings.sort_by(|a, b| a.id.cmp(&b.id));
        listings
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, SettlementError> {
        Ok(self.transactions.get(&id).map(|entry| entry.record.clone()))
    }

    async fn create_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, SettlementError> {
        let record = Transaction {
            id: Uuid::new_v4(),
            cart: transaction.cart,
            billing_address: transaction.billing_address,
            buyer: transaction.buyer,
            total_price: transaction.total_price,
            payment_info: transaction.payment_info,
            status: TransactionStatus::Processing,
            created_at: Utc::now(),
            completed_at: None,
            settlement: None,
        };
        let seq = self.next_seq();
        self.transactions.insert(
            record.id,
            Sequenced {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn save_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, SettlementError> {
        let mut entry = self
            .transactions
            .get_mut(&transaction.id)
            .ok_or_else(|| SettlementError::transaction_not_found(transaction.id))?;
        entry.record = transaction.clone();
        Ok(entry.record.clone())
    }

    async fn find_transactions(
        &self,
        query: TransactionQuery,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>, SettlementError> {
        let mut matching: Vec<Sequenced<Transaction>> = self
            .transactions
            .iter()
            .filter(|entry| query.matches(&entry.record))
            .map(|entry| entry.value().clone())
            .collect();

        match sort {
            TransactionSort::CreatedDesc => {
                matching.sort_by_key(|t| Reverse((t.record.created_at, t.seq)));
            }
            TransactionSort::CompletedThenCreatedDesc => {
                // `None` sorts below `Some`, so never-completed records land last
                matching.sort_by_key(|t| {
                    Reverse((t.record.completed_at, t.record.created_at, t.seq))
                });
            }
        }

        Ok(matching.into_iter().map(|t| t.record).collect())
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<Withdrawal>, SettlementError> {
        Ok(self.withdrawals.get(&id).map(|entry| entry.record.clone()))
    }

    async fn create_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> Result<Withdrawal, SettlementError> {
        let now = Utc::now();
        let entry = self
            .withdrawals
            .entry(withdrawal.id)
            .or_insert_with(|| Sequenced {
                seq: self.next_seq(),
                record: Withdrawal {
                    id: withdrawal.id,
                    seller_id: withdrawal.seller_id,
                    amount: withdrawal.amount,
                    status: WithdrawalStatus::Processing,
                    created_at: now,
                    updated_at: now,
                },
            });
        Ok(entry.record.clone())
    }

    async fn save_withdrawal(
        &self,
        withdrawal: &Withdrawal,
    ) -> Result<Withdrawal, SettlementError> {
        let mut entry = self
            .withdrawals
            .get_mut(&withdrawal.id)
            .ok_or_else(|| SettlementError::withdrawal_not_found(withdrawal.id))?;
        entry.record = withdrawal.clone();
        Ok(entry.record.clone())
    }

    async fn find_withdrawals(&self) -> Result<Vec<Withdrawal>, SettlementError> {
        let mut all: Vec<Sequenced<Withdrawal>> = self
            .withdrawals
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|w| Reverse((w.record.created_at, w.seq)));
        Ok(all.into_iter().map(|w| w.record).collect())
    }

    async fn find_seller(&self, id: &str) -> Result<Option<Seller>, SettlementError> {
        Ok(self.sellers.get(id).map(|entry| entry.value().clone()))
    }

    async fn adjust_seller_balance(
        &self,
        id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<Seller, SettlementError> {
        let mut entry = self
            .sellers
            .get_mut(id)
            .ok_or_else(|| SettlementError::seller_not_found(id))?;
        let seller = entry.value_mut();
        seller.available_balance = adjustment.apply(id, seller.available_balance)?;
        Ok(seller.clone())
    }

    async fn credit_sale(
        &self,
        id: &str,
        transaction: TransactionId,
        amount: Decimal,
    ) -> Result<Seller, SettlementError> {
        let mut entry = self
            .sellers
            .get_mut(id)
            .ok_or_else(|| SettlementError::seller_not_found(id))?;
        let seller = entry.value_mut();
        if !self.credited_sales.insert(transaction) {
            tracing::debug!(seller = %id, %transaction, "sale already credited");
            return Ok(seller.clone());
        }
        match BalanceAdjustment::Credit(amount).apply(id, seller.available_balance) {
            Ok(balance) => {
                seller.available_balance = balance;
                Ok(seller.clone())
            }
            Err(e) => {
                self.credited_sales.remove(&transaction);
                Err(e)
            }
        }
    }

    async fn append_payout(
        &self,
        id: &str,
        entry: PayoutEntry,
    ) -> Result<Seller, SettlementError> {
        let mut seller_entry = self
            .sellers
            .get_mut(id)
            .ok_or_else(|| SettlementError::seller_not_found(id))?;
        let seller = seller_entry.value_mut();
        if !seller.transactions.iter().any(|existing| existing.id == entry.id) {
            seller.transactions.push(entry);
        }
        Ok(seller.clone())
    }

    async fn find_listing(&self, id: &str) -> Result<Option<Listing>, SettlementError> {
        Ok(self.listings.get(id).map(|entry| entry.value().clone()))
    }

    async fn adjust_listing_stock(
        &self,
        id: &str,
        adjustment: StockAdjustment,
    ) -> Result<Listing, SettlementError> {
        let mut entry = self
            .listings
            .get_mut(id)
            .ok_or_else(|| SettlementError::listing_not_found(id))?;
        adjustment.apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}
