//! Marketplace Settlement CLI
//!
//! Replays a CSV script of settlement operations against an in-memory ledger
//! and prints the final seller balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- script.csv > sellers.csv
//! cargo run -- --batch-size 500 --service-charge-rate 0.05 script.csv > sellers.csv
//! RUST_LOG=marketplace_settlement=debug cargo run -- script.csv
//! ```
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use marketplace_settlement::cli;
use marketplace_settlement::replay::ReplayRunner;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let runner = ReplayRunner::new(args.to_settlement_config(), args.batch_size());

    let mut output = std::io::stdout();
    if let Err(e) = runner.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, "replay failed");
        process::exit(1);
    }
}
