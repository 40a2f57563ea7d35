//! I/O module
//!
//! Handles replay script parsing and seller output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_record, write_sellers_csv, CsvRecord, ReplayOp, TransitionAction};
