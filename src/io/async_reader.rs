//! Asynchronous CSV reader with batch interface
//!
//! Streams replay operations from a CSV script. Rows are read in batches so a
//! long script never sits in memory at once.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of ReplayOps
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord, ReplayOp};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Provides batch reading over replay operations.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line: 1,
        }
    }

    /// Read up to `batch_size` replay operations
    ///
    /// Rows that fail to parse or convert are logged with their line number
    /// and skipped. Returns an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ReplayOp> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => {
                    self.line += 1;
                    match convert_csv_record(csv_record) {
                        Ok(op) => batch.push(op),
                        Err(e) => tracing::warn!(line = self.line, error = %e, "skipping replay row"),
                    }
                }
                Some(Err(e)) => {
                    self.line += 1;
                    tracing::warn!(line = self.line, error = %e, "unparseable replay row");
                }
                None => break,
            }
        }

        batch
    }
}
