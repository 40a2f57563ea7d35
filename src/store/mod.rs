//! Ledger store implementations
//!
//! The settlement core talks to storage only through
//! [`LedgerStore`](crate::core::traits::LedgerStore). This module ships the
//! in-memory implementation used by the replay CLI and the tests.

pub mod memory;

pub use memory::InMemoryLedgerStore;
