//! Transaction lifecycle management
//!
//! This module provides the [`TransactionLifecycleManager`], which turns a
//! checkout into per-seller transactions and drives each of them through the
//! status state machine, applying the inventory and balance effects attached
//! to each transition:
//!
//! | Transition | Effect |
//! |---|---|
//! | → Transferred to delivery partner | stock −qty, sold +qty per item (best-effort) |
//! | → Completed | payment succeeded, service charge deducted, seller credited |
//! | → Refund Requested | none |
//! | → Refund Success | stock +qty, sold −qty per item (background, best-effort) |
//!
//! Every read-modify-write of one transaction runs under a per-transaction
//! lock, so two concurrent completions cannot both credit the seller.

use crate::config::SettlementConfig;
use crate::core::background::{retry, BackgroundTasks, RetryPolicy};
use crate::core::bounded::bounded;
use crate::core::cart_splitter::{split_cart, CheckoutRequest};
use crate::core::keyed_locks::KeyedLocks;
use crate::core::traits::{LedgerStore, TransactionQuery, TransactionSort};
use crate::types::{
    CartItem, PaymentStatus, SettlementError, Settlement, StockAdjustment,
    Transaction, TransactionId, TransactionStatus,
};
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Orchestrates checkout, status transitions and their side effects
pub struct TransactionLifecycleManager {
    store: Arc<dyn LedgerStore>,
    config: SettlementConfig,
    locks: KeyedLocks<TransactionId>,
    background: BackgroundTasks,
}

impl TransactionLifecycleManager {
    /// Create a manager over `store`
    pub fn new(store: Arc<dyn LedgerStore>, config: SettlementConfig) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
            background: BackgroundTasks::new(),
        }
    }

    async fn store_call<T, Fut>(&self, operation: &str, call: Fut) -> Result<T, SettlementError>
    where
        Fut: Future<Output = Result<T, SettlementError>>,
    {
        bounded(operation, self.config.store_timeout, call).await
    }

    /// Split a checkout by seller and persist one transaction per seller
    ///
    /// # Returns
    ///
    /// The created transactions, all in `Processing`, in first-seen seller
    /// order. An empty cart creates nothing and returns an empty vector.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] when the total price is negative
    /// - store failures; sub-orders persisted before the failure are kept
    pub async fn create_transactions(
        &self,
        checkout: CheckoutRequest,
    ) -> Result<Vec<Transaction>, SettlementError> {
        if checkout.total_price < Decimal::ZERO {
            return Err(SettlementError::invalid_amount(
                checkout.total_price,
                "checkout",
            ));
        }

        let buyer = checkout.buyer.id.clone();
        let sub_orders = split_cart(checkout);
        let mut created = Vec::with_capacity(sub_orders.len());

        for sub_order in sub_orders {
            let seller = sub_order.seller_id.clone();
            let transaction = match self
                .store_call("create_transaction", self.store.create_transaction(sub_order))
                .await
            {
                Ok(transaction) => transaction,
                Err(e) => {
                    tracing::error!(
                        %buyer,
                        %seller,
                        persisted = created.len(),
                        error = %e,
                        "checkout interrupted"
                    );
                    return Err(e);
                }
            };
            tracing::info!(
                transaction = %transaction.id,
                %buyer,
                %seller,
                items = transaction.cart.len(),
                "transaction created"
            );
            created.push(transaction);
        }

        Ok(created)
    }

    /// Transactions placed by `buyer`, newest first
    pub async fn list_for_buyer(&self, buyer: &str) -> Result<Vec<Transaction>, SettlementError> {
        self.store_call(
            "find_transactions",
            self.store.find_transactions(
                TransactionQuery::ByBuyer(buyer.to_string()),
                TransactionSort::CreatedDesc,
            ),
        )
        .await
    }

    /// Transactions of `seller`, newest first
    pub async fn list_for_seller(&self, seller: &str) -> Result<Vec<Transaction>, SettlementError> {
        self.store_call(
            "find_transactions",
            self.store.find_transactions(
                TransactionQuery::BySeller(seller.to_string()),
                TransactionSort::CreatedDesc,
            ),
        )
        .await
    }

    /// Every transaction (admin view), most recently completed first, then newest first
    pub async fn list_all(&self) -> Result<Vec<Transaction>, SettlementError> {
        self.store_call(
            "find_transactions",
            self.store
                .find_transactions(TransactionQuery::All, TransactionSort::CompletedThenCreatedDesc),
        )
        .await
    }

    /// Seller-driven status change
    ///
    /// Accepts `Transferred to delivery partner`, `Completed` and
    /// `Refund Success`; a refund request belongs to the buyer.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::TransactionNotFound`]
    /// - [`SettlementError::Unauthorized`] when `seller` does not own the
    ///   transaction, or asks for `Refund Requested`
    /// - [`SettlementError::InvalidTransition`] when the state machine forbids the move
    /// - store failures (the completion credit is rolled back with the status)
    pub async fn update_status(
        &self,
        id: TransactionId,
        seller: &str,
        status: TransactionStatus,
    ) -> Result<Transaction, SettlementError> {
        if status == TransactionStatus::RefundRequested {
            return Err(SettlementError::unauthorized(seller, "request a refund on", id));
        }

        let _guard = self.locks.lock(&id).await;
        let transaction = self.load(id).await?;
        ensure_seller(&transaction, seller, "update")?;
        self.transition(transaction, status).await
    }

    /// Buyer asks for a refund; a pure status change
    pub async fn request_refund(
        &self,
        id: TransactionId,
        buyer: &str,
    ) -> Result<Transaction, SettlementError> {
        let _guard = self.locks.lock(&id).await;
        let transaction = self.load(id).await?;
        if transaction.buyer.id != buyer {
            return Err(SettlementError::unauthorized(buyer, "refund", id));
        }
        self.transition(transaction, TransactionStatus::RefundRequested)
            .await
    }

    /// Seller accepts a refund
    ///
    /// The status change is persisted and returned immediately; restocking the
    /// listings runs in the background and never reports failure to the caller.
    pub async fn confirm_refund(
        &self,
        id: TransactionId,
        seller: &str,
    ) -> Result<Transaction, SettlementError> {
        let _guard = self.locks.lock(&id).await;
        let transaction = self.load(id).await?;
        ensure_seller(&transaction, seller, "confirm a refund on")?;
        self.transition(transaction, TransactionStatus::RefundSuccess)
            .await
    }

    /// Wait for every background side effect queued so far
    pub async fn drain_background(&self) {
        self.background.drain().await;
    }

    async fn load(&self, id: TransactionId) -> Result<Transaction, SettlementError> {
        self.store_call("find_transaction", self.store.find_transaction(id))
            .await?
            .ok_or_else(|| SettlementError::transaction_not_found(id))
    }

    /// Validate and apply `next`; caller holds the transaction lock
    async fn transition(
        &self,
        transaction: Transaction,
        next: TransactionStatus,
    ) -> Result<Transaction, SettlementError> {
        let current = transaction.status;
        if !current.can_transition_to(next) {
            return Err(SettlementError::invalid_transition(transaction.id, current, next));
        }

        if let Some(caveat) = refund_caveat(&transaction, next) {
            tracing::warn!(transaction = %transaction.id, from = %current, to = %next, "{}", caveat);
        }

        let mut updated = transaction.clone();
        updated.status = next;

        let saved = match next {
            TransactionStatus::Completed => self.complete(transaction, updated).await?,
            TransactionStatus::TransferredToDeliveryPartner => {
                let saved = self
                    .store_call("save_transaction", self.store.save_transaction(&updated))
                    .await?;
                let failed = adjust_listings(
                    self.store.as_ref(),
                    saved.id,
                    &saved.cart,
                    StockAdjustment::dispatch,
                    RetryPolicy {
                        attempts: 1,
                        backoff: Duration::ZERO,
                    },
                    self.config.store_timeout,
                )
                .await;
                if failed > 0 {
                    tracing::warn!(transaction = %saved.id, failed, "dispatch left some listings unadjusted");
                }
                saved
            }
            TransactionStatus::RefundSuccess => {
                let saved = self
                    .store_call("save_transaction", self.store.save_transaction(&updated))
                    .await?;
                self.queue_restock(&saved).await;
                saved
            }
            TransactionStatus::Processing | TransactionStatus::RefundRequested => {
                self.store_call("save_transaction", self.store.save_transaction(&updated))
                    .await?
            }
        };

        tracing::info!(
            transaction = %saved.id,
            from = %current,
            to = %next,
            "transaction status changed"
        );
        Ok(saved)
    }

    /// Settle a completed transaction
    ///
    /// The `Completed` status is persisted before the credit, so a concurrent
    /// or repeated completion is rejected by the state machine. When the
    /// credit fails the previous record is restored. The credit is keyed by
    /// the transaction id, so completing again after a credit that landed but
    /// reported a failure (a timeout) does not pay the seller twice.
    async fn complete(
        &self,
        previous: Transaction,
        mut updated: Transaction,
    ) -> Result<Transaction, SettlementError> {
        let seller = previous.seller_id().map(str::to_string).ok_or_else(|| {
            SettlementError::invalid_transition(
                previous.id,
                previous.status,
                TransactionStatus::Completed,
            )
        })?;

        let service_charge = self.config.service_charge(previous.total_price);
        let seller_credit = previous
            .total_price
            .checked_sub(service_charge)
            .ok_or_else(|| SettlementError::arithmetic_overflow("service charge", &seller))?;

        updated.completed_at = Some(Utc::now());
        updated.payment_info.status = PaymentStatus::Succeeded;
        updated.settlement = Some(Settlement {
            service_charge,
            seller_credit,
        });

        let saved = self
            .store_call("save_transaction", self.store.save_transaction(&updated))
            .await?;

        let credit = self
            .store_call(
                "credit_sale",
                self.store.credit_sale(&seller, saved.id, seller_credit),
            )
            .await;

        match credit {
            Ok(account) => {
                tracing::info!(
                    transaction = %saved.id,
                    %seller,
                    %service_charge,
                    %seller_credit,
                    balance = %account.available_balance,
                    "seller credited"
                );
                Ok(saved)
            }
            Err(e) => {
                tracing::error!(transaction = %saved.id, %seller, error = %e, "credit failed, restoring transaction");
                if let Err(restore) = self
                    .store_call("save_transaction", self.store.save_transaction(&previous))
                    .await
                {
                    tracing::error!(
                        transaction = %previous.id,
                        error = %restore,
                        "transaction left completed without seller credit"
                    );
                }
                Err(e)
            }
        }
    }

    async fn queue_restock(&self, transaction: &Transaction) {
        let store = Arc::clone(&self.store);
        let id = transaction.id;
        let cart = transaction.cart.clone();
        let policy = RetryPolicy {
            attempts: self.config.restock_attempts,
            backoff: self.config.restock_backoff,
        };
        let limit = self.config.store_timeout;

        self.background
            .submit(async move {
                let failed = adjust_listings(
                    store.as_ref(),
                    id,
                    &cart,
                    StockAdjustment::restock,
                    policy,
                    limit,
                )
                .await;
                if failed > 0 {
                    tracing::error!(transaction = %id, failed, "refund restock gave up on some listings");
                } else {
                    tracing::debug!(transaction = %id, "refund restock done");
                }
            })
            .await;
    }
}

fn ensure_seller(
    transaction: &Transaction,
    seller: &str,
    operation: &str,
) -> Result<(), SettlementError> {
    if transaction.seller_id() == Some(seller) {
        Ok(())
    } else {
        Err(SettlementError::unauthorized(seller, operation, transaction.id))
    }
}

/// Side effect of a refund step that the ledger does not undo
///
/// A refund never claws back a completion credit, and confirming a refund
/// always restocks, even for an order that was never dispatched.
fn refund_caveat(transaction: &Transaction, next: TransactionStatus) -> Option<&'static str> {
    match next {
        TransactionStatus::RefundRequested
            if transaction.status == TransactionStatus::Processing =>
        {
            Some("refund requested before dispatch; confirming it restocks listings that were never decremented")
        }
        TransactionStatus::RefundSuccess if transaction.settlement.is_some() => {
            Some("refund of a settled sale; the seller credit is kept")
        }
        _ => None,
    }
}

/// Apply `adjustment(qty)` to every listing of `cart` concurrently
///
/// Each item is retried under `policy`; failures are logged and counted, never
/// propagated, and never stop sibling items.
async fn adjust_listings(
    store: &dyn LedgerStore,
    transaction: TransactionId,
    cart: &[CartItem],
    adjustment: fn(u32) -> StockAdjustment,
    policy: RetryPolicy,
    limit: Duration,
) -> usize {
    let updates = cart.iter().map(|item| {
        let listing = item.listing_id.as_str();
        let change = adjustment(item.qty);
        async move {
            let result = retry(policy, move || {
                bounded(
                    "adjust_listing_stock",
                    limit,
                    store.adjust_listing_stock(listing, change),
                )
            })
            .await;
            if let Err(e) = &result {
                tracing::warn!(%transaction, %listing, error = %e, "stock adjustment failed");
            }
            result.is_err()
        }
    });

    join_all(updates)
        .await
        .into_iter()
        .filter(|failed| *failed)
        .count()
}
