//! Withdrawal lifecycle management
//!
//! A seller requests a payout against its available balance; an admin later
//! confirms it. Requesting reserves the funds right away, confirming records
//! the payout in the seller's history and notifies the seller.
//!
//! # Consistency
//!
//! - Requests of one seller are serialized, and the reservation itself is an
//!   atomic checked debit in the store, so a balance is never overdrawn.
//! - If the withdrawal record cannot be created after the funds were
//!   reserved, the reservation is credited back before the error is returned,
//!   but only when the store confirms the record does not exist.
//! - Confirmation is idempotent: the history entry carries the withdrawal id
//!   and a second confirmation neither appends nor notifies again.

use crate::config::SettlementConfig;
use crate::core::bounded::bounded;
use crate::core::keyed_locks::KeyedLocks;
use crate::core::traits::{LedgerStore, Notification, Notifier};
use crate::notify;
use crate::types::{
    BalanceAdjustment, NewWithdrawal, PayoutEntry, Seller, SellerId, SettlementError, Withdrawal,
    WithdrawalId, WithdrawalStatus,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;

/// Outcome of [`WithdrawalLifecycleManager::confirm`]
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutConfirmation {
    /// The withdrawal, now `succeed`
    pub withdrawal: Withdrawal,
    /// Whether the payout mail went out during this call
    pub notified: bool,
    /// Whether the withdrawal had already been confirmed before this call
    pub already_confirmed: bool,
}

/// Orchestrates payout requests and their confirmation
pub struct WithdrawalLifecycleManager {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    config: SettlementConfig,
    seller_locks: KeyedLocks<SellerId>,
    withdrawal_locks: KeyedLocks<WithdrawalId>,
}

impl WithdrawalLifecycleManager {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            seller_locks: KeyedLocks::new(),
            withdrawal_locks: KeyedLocks::new(),
        }
    }

    async fn store_call<T, Fut>(&self, operation: &str, call: Fut) -> Result<T, SettlementError>
    where
        Fut: Future<Output = Result<T, SettlementError>>,
    {
        bounded(operation, self.config.store_timeout, call).await
    }

    async fn send(&self, notification: Notification) -> Result<(), SettlementError> {
        bounded(
            "send_notification",
            self.config.notifier_timeout,
            self.notifier.send(notification),
        )
        .await
    }

    async fn load_seller(&self, id: &str) -> Result<Seller, SettlementError> {
        self.store_call("find_seller", self.store.find_seller(id))
            .await?
            .ok_or_else(|| SettlementError::seller_not_found(id))
    }

    /// Request a payout of `amount` for `seller_id`
    ///
    /// The seller is told the request is processing before anything is
    /// written; if that mail cannot be sent the request is abandoned.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] when `amount` is not positive
    /// - [`SettlementError::SellerNotFound`]
    /// - [`SettlementError::InsufficientFunds`] when `amount` exceeds the available balance
    /// - notifier and store failures
    pub async fn create(
        &self,
        seller_id: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, SettlementError> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::invalid_amount(amount, "withdrawal"));
        }

        let _guard = self.seller_locks.lock(&seller_id.to_string()).await;
        let seller = self.load_seller(seller_id).await?;
        if seller.available_balance < amount {
            return Err(SettlementError::insufficient_funds(
                seller_id,
                seller.available_balance,
                amount,
            ));
        }

        if let Err(e) = self.send(notify::withdraw_requested(&seller, amount)).await {
            tracing::error!(seller = %seller_id, %amount, error = %e, "withdraw request notification failed");
            return Err(e);
        }

        let reserved = self
            .store_call(
                "adjust_seller_balance",
                self.store
                    .adjust_seller_balance(seller_id, BalanceAdjustment::Debit(amount)),
            )
            .await?;

        let request = NewWithdrawal::new(seller_id, amount);
        let withdrawal_id = request.id;
        let created = self
            .store_call("create_withdrawal", self.store.create_withdrawal(request))
            .await;

        match created {
            Ok(withdrawal) => {
                tracing::info!(
                    withdrawal = %withdrawal.id,
                    seller = %seller_id,
                    %amount,
                    balance = %reserved.available_balance,
                    "withdrawal requested"
                );
                Ok(withdrawal)
            }
            Err(e) => self.settle_failed_create(withdrawal_id, seller_id, amount, e).await,
        }
    }

    /// Decide what a failed `create_withdrawal` left behind
    ///
    /// The call may have failed after the record was written (a timeout), so
    /// the reservation is only released once the store confirms the record is
    /// absent. A record that did land is returned as the created withdrawal.
    async fn settle_failed_create(
        &self,
        withdrawal_id: WithdrawalId,
        seller_id: &str,
        amount: Decimal,
        error: SettlementError,
    ) -> Result<Withdrawal, SettlementError> {
        let lookup = self
            .store_call("find_withdrawal", self.store.find_withdrawal(withdrawal_id))
            .await;

        match lookup {
            Ok(Some(withdrawal)) => {
                tracing::warn!(
                    withdrawal = %withdrawal_id,
                    seller = %seller_id,
                    %amount,
                    error = %error,
                    "withdrawal recorded despite a failed create call"
                );
                Ok(withdrawal)
            }
            Ok(None) => {
                tracing::error!(seller = %seller_id, %amount, error = %error, "withdrawal not recorded, releasing reservation");
                if let Err(release) = self
                    .store_call(
                        "adjust_seller_balance",
                        self.store
                            .adjust_seller_balance(seller_id, BalanceAdjustment::Credit(amount)),
                    )
                    .await
                {
                    tracing::error!(
                        seller = %seller_id,
                        %amount,
                        error = %release,
                        "reservation could not be released"
                    );
                }
                Err(error)
            }
            Err(lookup) => {
                // outcome unknown; the reservation stays
                tracing::error!(
                    withdrawal = %withdrawal_id,
                    seller = %seller_id,
                    %amount,
                    error = %error,
                    lookup_error = %lookup,
                    "withdrawal outcome unknown, reservation kept"
                );
                Err(error)
            }
        }
    }

    /// Every withdrawal (admin view), newest first
    pub async fn list(&self) -> Result<Vec<Withdrawal>, SettlementError> {
        self.store_call("find_withdrawals", self.store.find_withdrawals())
            .await
    }

    /// Confirm a payout (admin)
    ///
    /// Marks the withdrawal `succeed`, appends it to the seller's payout
    /// history and notifies the seller. A failed notification is logged and
    /// reported through [`PayoutConfirmation::notified`]; the payout stays
    /// confirmed.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::WithdrawalNotFound`]
    /// - [`SettlementError::SellerNotFound`]
    /// - [`SettlementError::SellerMismatch`] when the withdrawal belongs to another seller
    /// - store failures
    pub async fn confirm(
        &self,
        withdrawal_id: WithdrawalId,
        seller_id: &str,
    ) -> Result<PayoutConfirmation, SettlementError> {
        let _guard = self.withdrawal_locks.lock(&withdrawal_id).await;

        let withdrawal = self
            .store_call("find_withdrawal", self.store.find_withdrawal(withdrawal_id))
            .await?
            .ok_or_else(|| SettlementError::withdrawal_not_found(withdrawal_id))?;
        let seller = self.load_seller(seller_id).await?;
        if withdrawal.seller_id != seller_id {
            return Err(SettlementError::seller_mismatch(
                withdrawal_id,
                &withdrawal.seller_id,
                seller_id,
            ));
        }

        if withdrawal.status == WithdrawalStatus::Succeed {
            // repairs a history append lost by an earlier, interrupted confirmation
            self.store_call(
                "append_payout",
                self.store.append_payout(seller_id, payout_entry(&withdrawal)),
            )
            .await?;
            tracing::info!(withdrawal = %withdrawal_id, seller = %seller_id, "withdrawal already confirmed");
            return Ok(PayoutConfirmation {
                withdrawal,
                notified: false,
                already_confirmed: true,
            });
        }

        let mut updated = withdrawal;
        updated.status = WithdrawalStatus::Succeed;
        updated.updated_at = Utc::now();
        let saved = self
            .store_call("save_withdrawal", self.store.save_withdrawal(&updated))
            .await?;

        let history = self
            .store_call(
                "append_payout",
                self.store.append_payout(seller_id, payout_entry(&saved)),
            )
            .await?;

        let notified = match self
            .send(notify::payout_confirmed(&seller, saved.amount))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(withdrawal = %saved.id, seller = %seller_id, error = %e, "payout notification failed");
                false
            }
        };

        tracing::info!(
            withdrawal = %saved.id,
            seller = %seller_id,
            amount = %saved.amount,
            payouts = history.transactions.len(),
            notified,
            "withdrawal confirmed"
        );

        Ok(PayoutConfirmation {
            withdrawal: saved,
            notified,
            already_confirmed: false,
        })
    }
}

fn payout_entry(withdrawal: &Withdrawal) -> PayoutEntry {
    PayoutEntry {
        id: withdrawal.id,
        amount: withdrawal.amount,
        updated_at: withdrawal.updated_at,
        status: withdrawal.status,
    }
}
