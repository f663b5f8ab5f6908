//! I/O module
//!
//! Handles CSV parsing of the catalog and operation script, and report
//! output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `sync_reader` - Synchronous reader with iterator interface, plus catalog loading
//! - `async_reader` - Asynchronous reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_catalog_record, convert_csv_record, write_bookings_csv, write_payments_csv,
    CatalogRecord, CsvRecord, Operation,
};
pub use sync_reader::{load_catalog, SyncReader};
