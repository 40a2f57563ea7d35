//! Replay of settlement scripts
//!
//! Drives the settlement core with a CSV script against an in-memory store
//! and writes the final seller balances. Scripts name checkouts and
//! withdrawals by free-form references; [`Replay`] maps them to the ids the
//! store hands out.
//!
//! # Architecture
//!
//! ```text
//! ReplayRunner
//!     ├── AsyncReader (batch CSV reading)
//!     └── Replay
//!         ├── TransactionLifecycleManager ─┐
//!         ├── WithdrawalLifecycleManager ──┼── InMemoryLedgerStore
//!         └── TracingNotifier              ┘
//! ```
//!
//! Operations are applied strictly in script order. A rejected operation is
//! logged and the replay moves on.

use crate::config::SettlementConfig;
use crate::core::{CheckoutRequest, TransactionLifecycleManager, WithdrawalLifecycleManager};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_sellers_csv, ReplayOp, TransitionAction};
use crate::notify::TracingNotifier;
use crate::store::InMemoryLedgerStore;
use crate::types::{
    BillingAddress, Buyer, CartItem, Listing, PaymentInfo, Seller, SellerId, SettlementError,
    TransactionId, TransactionStatus, WithdrawalId,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Default number of script rows read per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Script interpreter over a fresh in-memory ledger
pub struct Replay {
    store: Arc<InMemoryLedgerStore>,
    transactions: TransactionLifecycleManager,
    withdrawals: WithdrawalLifecycleManager,
    pending_carts: HashMap<String, Vec<CartItem>>,
    orders: HashMap<(String, SellerId), TransactionId>,
    buyers: HashMap<String, String>,
    withdrawal_refs: HashMap<String, WithdrawalId>,
}

impl Replay {
    pub fn new(config: SettlementConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        Self {
            transactions: TransactionLifecycleManager::new(store.clone(), config.clone()),
            withdrawals: WithdrawalLifecycleManager::new(
                store.clone(),
                Arc::new(TracingNotifier),
                config,
            ),
            store,
            pending_carts: HashMap::new(),
            orders: HashMap::new(),
            buyers: HashMap::new(),
            withdrawal_refs: HashMap::new(),
        }
    }

    /// Apply one script operation
    pub async fn apply(&mut self, op: ReplayOp) -> Result<(), SettlementError> {
        match op {
            ReplayOp::Seller { seller, balance } => {
                let email = format!("{}@sellers.local", seller);
                let mut record = Seller::new(seller.clone(), seller, email);
                record.available_balance = balance;
                self.store.insert_seller(record);
                Ok(())
            }
            ReplayOp::Listing {
                seller,
                listing,
                stock,
            } => {
                self.store.insert_listing(Listing::new(listing, seller, stock));
                Ok(())
            }
            ReplayOp::Item {
                checkout,
                seller,
                listing,
                qty,
            } => {
                self.pending_carts
                    .entry(checkout)
                    .or_default()
                    .push(CartItem::new(listing, seller, qty));
                Ok(())
            }
            ReplayOp::Checkout {
                checkout,
                buyer,
                total,
            } => self.checkout(checkout, buyer, total).await,
            ReplayOp::Transition {
                checkout,
                seller,
                action,
            } => self.transition(&checkout, seller, action).await,
            ReplayOp::Withdraw {
                reference,
                seller,
                amount,
            } => {
                let withdrawal = self.withdrawals.create(&seller, amount).await?;
                self.withdrawal_refs.insert(reference, withdrawal.id);
                Ok(())
            }
            ReplayOp::Confirm { reference, seller } => {
                let id = *self
                    .withdrawal_refs
                    .get(&reference)
                    .ok_or_else(|| SettlementError::withdrawal_not_found(&reference))?;
                self.withdrawals.confirm(id, &seller).await?;
                Ok(())
            }
        }
    }

    async fn checkout(
        &mut self,
        checkout: String,
        buyer: String,
        total: Decimal,
    ) -> Result<(), SettlementError> {
        let cart = self.pending_carts.remove(&checkout).unwrap_or_default();
        let request = CheckoutRequest {
            cart,
            billing_address: BillingAddress::default(),
            buyer: Buyer {
                id: buyer.clone(),
                name: buyer.clone(),
                email: format!("{}@buyers.local", buyer),
            },
            total_price: total,
            payment_info: PaymentInfo::default(),
        };

        let created = self.transactions.create_transactions(request).await?;
        if created.is_empty() {
            tracing::warn!(%checkout, "checkout without items");
        }
        for transaction in created {
            if let Some(seller) = transaction.seller_id() {
                self.orders
                    .insert((checkout.clone(), seller.to_string()), transaction.id);
            }
        }
        self.buyers.insert(checkout, buyer);
        Ok(())
    }

    async fn transition(
        &mut self,
        checkout: &str,
        seller: SellerId,
        action: TransitionAction,
    ) -> Result<(), SettlementError> {
        let id = *self
            .orders
            .get(&(checkout.to_string(), seller.clone()))
            .ok_or_else(|| SettlementError::transaction_not_found(format!("{}/{}", checkout, seller)))?;

        match action {
            TransitionAction::Ship => {
                self.transactions
                    .update_status(id, &seller, TransactionStatus::TransferredToDeliveryPartner)
                    .await?;
            }
            TransitionAction::Complete => {
                self.transactions
                    .update_status(id, &seller, TransactionStatus::Completed)
                    .await?;
            }
            TransitionAction::RefundRequest => {
                let buyer = self.buyers.get(checkout).cloned().unwrap_or_default();
                self.transactions.request_refund(id, &buyer).await?;
            }
            TransitionAction::Refund => {
                self.transactions.confirm_refund(id, &seller).await?;
            }
        }
        Ok(())
    }

    /// Wait for background work and return every seller, sorted by id
    pub async fn finish(self) -> Vec<Seller> {
        self.transactions.drain_background().await;
        self.store.sellers()
    }

    /// The underlying store, for inspecting listings after a replay
    pub fn store(&self) -> &Arc<InMemoryLedgerStore> {
        &self.store
    }
}

/// Runs a replay script file end to end
#[derive(Debug, Clone)]
pub struct ReplayRunner {
    config: SettlementConfig,
    batch_size: usize,
}

impl ReplayRunner {
    /// A zero batch size falls back to [`DEFAULT_BATCH_SIZE`] with a warning.
    pub fn new(config: SettlementConfig, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 {
            tracing::warn!(default = DEFAULT_BATCH_SIZE, "invalid batch size, using default");
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        Self { config, batch_size }
    }

    /// Replay `input_path` and write seller balances to `output`
    ///
    /// # Errors
    ///
    /// Only fatal conditions: the runtime cannot start, the input cannot be
    /// opened, or the output cannot be written. Rejected operations are logged.
    pub fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut replay = Replay::new(self.config.clone());
            let mut applied = 0usize;
            let mut rejected = 0usize;

            loop {
                let batch = reader.read_batch(self.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                for op in batch {
                    let description = format!("{:?}", op);
                    match replay.apply(op).await {
                        Ok(()) => applied += 1,
                        Err(e) => {
                            rejected += 1;
                            tracing::warn!(op = %description, kind = %e.kind(), error = %e, "operation rejected");
                        }
                    }
                }
            }

            let sellers = replay.finish().await;
            tracing::info!(applied, rejected, sellers = sellers.len(), "replay finished");
            write_sellers_csv(&sellers, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn item(checkout: &str, seller: &str, listing: &str, qty: u32) -> ReplayOp {
        ReplayOp::Item {
            checkout: checkout.into(),
            seller: seller.into(),
            listing: listing.into(),
            qty,
        }
    }

    fn step(checkout: &str, seller: &str, action: TransitionAction) -> ReplayOp {
        ReplayOp::Transition {
            checkout: checkout.into(),
            seller: seller.into(),
            action,
        }
    }

    #[tokio::test]
    async fn test_checkout_then_complete_credits_each_seller() {
        let mut replay = Replay::new(SettlementConfig::default());
        for seller in ["A", "B"] {
            replay
                .apply(ReplayOp::Seller {
                    seller: seller.into(),
                    balance: Decimal::ZERO,
                })
                .await
                .unwrap();
        }
        replay.apply(item("o1", "A", "L1", 1)).await.unwrap();
        replay.apply(item("o1", "B", "L2", 1)).await.unwrap();
        replay
            .apply(ReplayOp::Checkout {
                checkout: "o1".into(),
                buyer: "u1".into(),
                total: Decimal::new(100, 0),
            })
            .await
            .unwrap();
        replay
            .apply(step("o1", "A", TransitionAction::Complete))
            .await
            .unwrap();

        let sellers = replay.finish().await;
        assert_eq!(sellers[0].available_balance, Decimal::new(90, 0));
        assert_eq!(sellers[1].available_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let mut replay = Replay::new(SettlementConfig::default());

        let error = replay
            .apply(step("missing", "A", TransitionAction::Ship))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), crate::types::ErrorKind::NotFound);

        let error = replay
            .apply(ReplayOp::Confirm {
                reference: "w9".into(),
                seller: "A".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), crate::types::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_refund_request_uses_checkout_buyer() {
        let mut replay = Replay::new(SettlementConfig::default());
        replay
            .apply(ReplayOp::Listing {
                seller: "A".into(),
                listing: "L1".into(),
                stock: 3,
            })
            .await
            .unwrap();
        replay.apply(item("o1", "A", "L1", 1)).await.unwrap();
        replay
            .apply(ReplayOp::Checkout {
                checkout: "o1".into(),
                buyer: "u1".into(),
                total: Decimal::new(10, 0),
            })
            .await
            .unwrap();

        replay
            .apply(step("o1", "A", TransitionAction::RefundRequest))
            .await
            .unwrap();
        replay
            .apply(step("o1", "A", TransitionAction::Refund))
            .await
            .unwrap();

        let store = Arc::clone(replay.store());
        replay.finish().await;
        let listing = &store.listings()[0];
        assert_eq!((listing.stock, listing.sold_out), (4, -1));
    }

    #[test]
    fn test_runner_writes_seller_balances() {
        let file = create_temp_csv(
            "type,ref,party,listing,qty,amount\n\
             seller,,A,,,500\n\
             withdraw,w1,A,,,200\n\
             confirm,w1,A,,,\n\
             withdraw,w2,A,,,900\n",
        );

        let mut output = Vec::new();
        ReplayRunner::new(SettlementConfig::default(), 2)
            .process(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "seller,available,withdrawn,payouts\nA,300.00,200.00,1\n"
        );
    }

    #[test]
    fn test_runner_handles_missing_file() {
        let runner = ReplayRunner::new(SettlementConfig::default(), DEFAULT_BATCH_SIZE);
        let mut output = Vec::new();

        let result = runner.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_zero_batch_size_falls_back_to_default() {
        let runner = ReplayRunner::new(SettlementConfig::default(), 0);
        assert_eq!(runner.batch_size, DEFAULT_BATCH_SIZE);
    }
}
