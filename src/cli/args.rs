use crate::config::SettlementConfig;
use crate::replay::DEFAULT_BATCH_SIZE;
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Replay marketplace settlement scripts
#[derive(Parser, Debug)]
#[command(name = "marketplace-settlement")]
#[command(about = "Replay a marketplace settlement script and print seller balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing settlement operations
    #[arg(value_name = "INPUT", help = "Path to the input CSV script")]
    pub input_file: PathBuf,

    /// Number of script rows read per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        env = "SETTLEMENT_BATCH_SIZE",
        help = "Number of script rows read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Fraction of a completed transaction kept by the platform
    #[arg(
        long = "service-charge-rate",
        value_name = "RATE",
        env = "SETTLEMENT_SERVICE_CHARGE_RATE",
        help = "Service charge deducted on completion, in [0, 1) (default: 0.10)"
    )]
    pub service_charge_rate: Option<Decimal>,

    /// Bound on each ledger store call, in milliseconds
    #[arg(
        long = "store-timeout-ms",
        value_name = "MS",
        env = "SETTLEMENT_STORE_TIMEOUT_MS"
    )]
    pub store_timeout_ms: Option<u64>,

    /// Bound on each notifier call, in milliseconds
    #[arg(
        long = "notifier-timeout-ms",
        value_name = "MS",
        env = "SETTLEMENT_NOTIFIER_TIMEOUT_MS"
    )]
    pub notifier_timeout_ms: Option<u64>,

    /// Attempts per listing when restocking after a refund
    #[arg(
        long = "restock-attempts",
        value_name = "COUNT",
        env = "SETTLEMENT_RESTOCK_ATTEMPTS"
    )]
    pub restock_attempts: Option<u32>,

    /// Delay before the first restock retry, in milliseconds
    #[arg(
        long = "restock-backoff-ms",
        value_name = "MS",
        env = "SETTLEMENT_RESTOCK_BACKOFF_MS"
    )]
    pub restock_backoff_ms: Option<u64>,
}

impl CliArgs {
    /// Build a SettlementConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults; invalid ones are replaced by
    /// the defaults with a warning (see [`SettlementConfig::new`]).
    pub fn to_settlement_config(&self) -> SettlementConfig {
        let default = SettlementConfig::default();
        let millis = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };

        SettlementConfig::new(
            self.service_charge_rate
                .unwrap_or(default.service_charge_rate),
            millis(self.store_timeout_ms, default.store_timeout),
            millis(self.notifier_timeout_ms, default.notifier_timeout),
            self.restock_attempts.unwrap_or(default.restock_attempts),
            millis(self.restock_backoff_ms, default.restock_backoff),
        )
    }

    /// Batch size for the script reader
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }
}
