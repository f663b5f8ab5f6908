//! Synchronous processing strategy
//!
//! Single-threaded pipeline: stream the operation script row by row
//! through the iterator interface and apply each operation to the engine
//! as it arrives. Memory stays O(bookings + payments), not O(script).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::cli::ReportKind;
use crate::core::{
    BookingPolicy, Clock, FixedClock, PaymentGateway, RentalEngine, ScriptedGateway, SystemClock,
};
use crate::io::sync_reader::{load_catalog, SyncReader};
use crate::strategy::{apply_operation, log_operation_error, write_report, ProcessingStrategy};

/// Synchronous processing strategy
///
/// Orchestration only: CSV parsing lives in the io layer, business logic
/// in the engine, report formatting in `csv_format`.
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    today: Option<NaiveDate>,
}

impl SyncProcessingStrategy {
    /// Create a strategy; `today` pins the engine clock when given
    pub fn new(today: Option<NaiveDate>) -> Self {
        Self { today }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        catalog_path: &Path,
        input_path: &Path,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let catalog = load_catalog(catalog_path)?;
        let gateway = Arc::new(ScriptedGateway::new());
        let clock: Arc<dyn Clock> = match self.today {
            Some(today) => Arc::new(FixedClock::for_date(today)),
            None => Arc::new(SystemClock),
        };
        let engine = RentalEngine::new(
            Arc::new(catalog),
            Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
            clock,
            BookingPolicy::default(),
        );

        let reader = SyncReader::new(input_path)?;
        for result in reader {
            let outcome = result.and_then(|op| apply_operation(&engine, &gateway, op));
            if let Err(e) = outcome {
                log_operation_error(&e);
            }
        }

        write_report(&engine, report, output)
    }
}
