//! Seller notifications
//!
//! Message templates for the two payout events, plus two [`Notifier`]
//! implementations:
//! - [`TracingNotifier`] writes each message to the log; used by the replay CLI
//! - [`OutboxNotifier`] keeps messages in memory and can be told to fail
//!
//! A real deployment injects its own mail client behind the same trait.

use crate::core::traits::{Notification, Notifier};
use crate::types::{Seller, SettlementError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Mail sent when a seller requests a payout
pub fn withdraw_requested(seller: &Seller, amount: Decimal) -> Notification {
    Notification {
        to: seller.email.clone(),
        subject: "Withdraw Request".to_string(),
        body: format!(
            "Hello {}, Your withdraw request of {}$ is processing. It will take 3 to 7 days to process!",
            seller.name, amount
        ),
    }
}

/// Mail sent when an admin confirms a payout
pub fn payout_confirmed(seller: &Seller, amount: Decimal) -> Notification {
    Notification {
        to: seller.email.clone(),
        subject: "Payment Confirmation".to_string(),
        body: format!(
            "Hello {}, Your withdraw request of {}$ is on the way. Delivery time depends on your bank's rules, it usually takes 3 to 7 days.",
            seller.name, amount
        ),
    }
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), SettlementError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "notification sent"
        );
        Ok(())
    }
}

/// Notifier recording every delivered message in memory
#[derive(Debug, Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far, oldest first
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: Notification) -> Result<(), SettlementError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SettlementError::notifier(
                &notification.to,
                "mail transport unavailable",
            ));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| SettlementError::notifier(&notification.to, "outbox poisoned"))?;
        sent.push(notification);
        Ok(())
    }
}
