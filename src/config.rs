//! Settlement configuration
//!
//! Tunables shared by the lifecycle managers: the platform fee, the bounded
//! waits imposed on the store and notifier, and the retry policy of the
//! background restock task.

use rust_decimal::Decimal;
use std::time::Duration;

/// Configuration for the settlement core
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementConfig {
    /// Fraction of a completed transaction's total kept by the platform
    pub service_charge_rate: Decimal,
    /// Upper bound on every ledger store call
    pub store_timeout: Duration,
    /// Upper bound on every notifier call
    pub notifier_timeout: Duration,
    /// Attempts per listing for the background refund restock
    pub restock_attempts: u32,
    /// Delay before the first restock retry, doubled on each further retry
    pub restock_backoff: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            service_charge_rate: Decimal::new(10, 2),
            store_timeout: Duration::from_secs(5),
            notifier_timeout: Duration::from_secs(10),
            restock_attempts: 3,
            restock_backoff: Duration::from_millis(100),
        }
    }
}

impl SettlementConfig {
    /// Create a new SettlementConfig with custom values
    ///
    /// Invalid values are replaced by their defaults with a warning:
    /// - a service charge rate outside `[0, 1)`
    /// - a zero timeout
    /// - zero restock attempts
    pub fn new(
        service_charge_rate: Decimal,
        store_timeout: Duration,
        notifier_timeout: Duration,
        restock_attempts: u32,
        restock_backoff: Duration,
    ) -> Self {
        let default = Self::default();

        let service_charge_rate =
            if service_charge_rate < Decimal::ZERO || service_charge_rate >= Decimal::ONE {
                tracing::warn!(
                    rate = %service_charge_rate,
                    default = %default.service_charge_rate,
                    "invalid service charge rate, using default"
                );
                default.service_charge_rate
            } else {
                service_charge_rate
            };

        let store_timeout = if store_timeout.is_zero() {
            tracing::warn!(default_ms = millis(default.store_timeout), "invalid store timeout, using default");
            default.store_timeout
        } else {
            store_timeout
        };

        let notifier_timeout = if notifier_timeout.is_zero() {
            tracing::warn!(default_ms = millis(default.notifier_timeout), "invalid notifier timeout, using default");
            default.notifier_timeout
        } else {
            notifier_timeout
        };

        let restock_attempts = if restock_attempts == 0 {
            tracing::warn!(default = default.restock_attempts, "invalid restock attempts, using default");
            default.restock_attempts
        } else {
            restock_attempts
        };

        Self {
            service_charge_rate,
            store_timeout,
            notifier_timeout,
            restock_attempts,
            restock_backoff,
        }
    }

    /// Service charge deducted from `total`
    pub fn service_charge(&self, total: Decimal) -> Decimal {
        total * self.service_charge_rate
    }
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
