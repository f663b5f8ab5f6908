//! Synchronous CSV reading
//!
//! [`SyncReader`] streams operations from the script file one row at a
//! time through an iterator, delegating format concerns to
//! [`crate::io::csv_format`]. [`load_catalog`] reads the (small) catalog
//! file eagerly.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found) are returned from the constructors
//! - Individual row errors are yielded as `Err` variants with line numbers
//!   so the caller can log and continue

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::core::InMemoryCatalog;
use crate::io::csv_format::{
    convert_catalog_record, convert_csv_record, CatalogRecord, CsvRecord, Operation,
};

/// Streaming iterator over the operation script
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open the script file for streaming iteration
    ///
    /// The CSV reader trims whitespace and accepts rows with trailing
    /// columns omitted, since most operations use only a few of them.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();

        match deserializer.next()? {
            Ok(record) => {
                self.line_num += 1;
                Some(
                    convert_csv_record(record)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}

/// Load the equipment catalog from a CSV file
///
/// Unlike the operation script, a malformed catalog row is fatal: an
/// engine running against half a catalog would silently reject valid
/// bookings.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open catalog '{}': {}", path.display(), e))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let catalog = InMemoryCatalog::new();
    for (index, result) in reader.deserialize::<CatalogRecord>().enumerate() {
        let record = result.map_err(|e| format!("Catalog line {}: {}", index + 2, e))?;
        let item = convert_catalog_record(record)
            .map_err(|e| format!("Catalog line {}: {}", index + 2, e))?;
        catalog.insert(item);
    }

    if catalog.is_empty() {
        return Err(format!("Catalog '{}' contains no items", path.display()));
    }
    Ok(catalog)
}
