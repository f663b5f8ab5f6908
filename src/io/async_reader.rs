//! Asynchronous CSV reading
//!
//! Streams operations from the script file in batches over tokio I/O.
//! Format concerns are delegated to [`crate::io::csv_format`], the same
//! as the synchronous path; only the transport differs.

use csv_async::AsyncReaderBuilder;
use futures::stream::StreamExt;
use tokio::io::AsyncRead;

use crate::io::csv_format::{convert_csv_record, CsvRecord, Operation};

/// Asynchronous operation-script reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send> AsyncReader<R> {
    /// Wrap an async reader providing CSV data
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read up to `batch_size` rows
    ///
    /// Malformed rows are yielded as `Err` variants in place, so the
    /// caller sees them in script order exactly like the sync iterator.
    /// An empty vector means end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Result<Operation, String>> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => {
                    self.line_num += 1;
                    batch.push(
                        convert_csv_record(record)
                            .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                    );
                }
                Some(Err(e)) => {
                    self.line_num += 1;
                    batch.push(Err(format!(
                        "Line {}: CSV parse error: {}",
                        self.line_num + 1,
                        e
                    )));
                }
                None => break,
            }
        }

        batch
    }
}
