//! Asynchronous processing strategy
//!
//! Reads the operation script in batches over tokio file I/O and applies
//! them to the shared, dashmap-backed engine. Batches are applied in
//! script order: operations are causally chained (a confirm references the
//! booking a create produced), so parallel application would reorder
//! effects. The async transport is what this strategy buys - the same
//! engine can be driven concurrently by an embedding service.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::cli::ReportKind;
use crate::core::{
    BookingPolicy, Clock, FixedClock, PaymentGateway, RentalEngine, ScriptedGateway, SystemClock,
};
use crate::io::async_reader::AsyncReader;
use crate::io::sync_reader::load_catalog;
use crate::strategy::{apply_operation, log_operation_error, write_report, ProcessingStrategy};

const BATCH_SIZE: usize = 1000;

/// Asynchronous processing strategy
#[derive(Debug, Clone, Copy)]
pub struct AsyncProcessingStrategy {
    today: Option<NaiveDate>,
}

impl AsyncProcessingStrategy {
    /// Create a strategy; `today` pins the engine clock when given
    pub fn new(today: Option<NaiveDate>) -> Self {
        Self { today }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        catalog_path: &Path,
        input_path: &Path,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            // The catalog is small; loading it synchronously keeps one
            // code path for both strategies.
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

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;
            let mut reader = AsyncReader::new(file);

            loop {
                let batch = reader.read_batch(BATCH_SIZE).await;
                if batch.is_empty() {
                    break;
                }
                for result in batch {
                    let outcome = result.and_then(|op| apply_operation(&engine, &gateway, op));
                    if let Err(e) = outcome {
                        log_operation_error(&e);
                    }
                }
            }

            write_report(&engine, report, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const OPS_HEADER: &str = "op,item,booking,payment,user,quantity,start_date,end_date,amount,external_ref,gateway_status,notes\n";

    fn strategy() -> AsyncProcessingStrategy {
        AsyncProcessingStrategy::new(NaiveDate::from_ymd_opt(2026, 6, 1))
    }

    #[test]
    fn test_async_strategy_matches_sync_semantics() {
        let catalog = create_temp_csv(
            "item,name,total_stock,daily_rate,active\n1,Excavator,2,100.00,true\n",
        );
        let ops = create_temp_csv(&format!(
            "{}create_booking,1,,,7,1,2026-06-10,2026-06-15,,,,\n\
             create_intent,,1,,,,,,,,,\n\
             gateway_status,,,,,,,,,pi_1,succeeded,\n\
             sync_gateway,,,,,,,,,pi_1,,\n",
            OPS_HEADER
        ));

        let mut output = Vec::new();
        strategy()
            .process(catalog.path(), ops.path(), ReportKind::Bookings, &mut output)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,1,7,confirmed,"));
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let catalog = create_temp_csv(
            "item,name,total_stock,daily_rate,active\n1,Excavator,2,100.00,true\n",
        );
        let mut output = Vec::new();
        let result = strategy().process(
            catalog.path(),
            Path::new("nonexistent.csv"),
            ReportKind::Bookings,
            &mut output,
        );
        assert!(result.unwrap_err().contains("Failed to open file"));
    }
}
