//! Processing strategy module for operation scripts
//!
//! Defines the Strategy pattern for complete processing pipelines: load
//! the catalog, stream the operation script into the engine, and write
//! the requested report. Both strategies drive the same thread-safe
//! [`RentalEngine`]; only the I/O transport differs.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::cli::{ReportKind, StrategyType};
use crate::core::{
    BookingRequest, PaymentOutcome, RentalEngine, ScriptedGateway,
};
use crate::io::csv_format::Operation;
use crate::types::{PaymentKind, PaymentMethod};

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncProcessingStrategy;
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete pipelines
///
/// Each strategy reads the catalog and the operation script, applies every
/// operation to a fresh engine, and writes the requested report to
/// `output`. Individual operation failures are logged and skipped; only
/// setup and I/O failures are fatal.
pub trait ProcessingStrategy: Send + Sync {
    /// Run the pipeline
    ///
    /// # Errors
    ///
    /// Returns `Err` for fatal problems only: an unreadable catalog or
    /// script file, or a report write failure. Rejected operations are
    /// logged and processing continues.
    fn process(
        &self,
        catalog_path: &Path,
        input_path: &Path,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Create a processing strategy for the given type
///
/// `today` pins the engine clock for reproducible runs; `None` uses the
/// system clock.
pub fn create_strategy(
    strategy_type: StrategyType,
    today: Option<NaiveDate>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(today)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(today)),
    }
}

/// Apply one operation to the engine
///
/// Shared by both strategies so sync and async runs of the same script
/// produce identical state. `gateway_status` rows are a harness concern
/// and go to the scripted gateway instead of the engine.
pub(crate) fn apply_operation(
    engine: &RentalEngine,
    gateway: &Arc<ScriptedGateway>,
    operation: Operation,
) -> Result<(), String> {
    match operation {
        Operation::CreateBooking {
            item,
            user,
            quantity,
            start_date,
            end_date,
            notes,
        } => {
            engine
                .create_booking(BookingRequest {
                    item_id: item,
                    requester: user,
                    start_date,
                    end_date,
                    quantity,
                    notes,
                    pickup_address: None,
                    return_address: None,
                })
                .map_err(|e| e.to_string())?;
        }
        Operation::ConfirmBooking { booking } => {
            engine.confirm_booking(booking).map_err(|e| e.to_string())?;
        }
        Operation::CancelBooking { booking } => {
            engine.cancel_booking(booking).map_err(|e| e.to_string())?;
        }
        Operation::ActivateBooking { booking } => {
            engine.activate_booking(booking).map_err(|e| e.to_string())?;
        }
        Operation::CompleteBooking {
            booking,
            return_date,
        } => {
            engine
                .complete_booking(booking, return_date)
                .map_err(|e| e.to_string())?;
        }
        Operation::CreateIntent {
            booking,
            user,
            amount,
            kind,
            notes,
        } => {
            let receipt = engine
                .create_payment_intent(booking, user, amount, "PLN", kind, notes)
                .map_err(|e| e.to_string())?;
            info!(
                payment = receipt.payment.id,
                external_ref = receipt.payment.external_ref.as_deref(),
                "intent created"
            );
        }
        Operation::GatewayStatus {
            external_ref,
            status,
        } => {
            gateway.set_status(&external_ref, status);
        }
        Operation::SyncGateway { external_ref } => {
            let PaymentOutcome { payment, action } = engine
                .sync_payment(&external_ref)
                .map_err(|e| e.to_string())?;
            info!(payment = payment.id, status = %payment.status, ?action, "gateway synced");
        }
        Operation::ApproveOffline {
            payment,
            approver,
            notes,
        } => {
            engine
                .approve_payment_offline(payment, approver, notes)
                .map_err(|e| e.to_string())?;
        }
        Operation::OfflinePayment {
            booking,
            amount,
            approver,
            notes,
        } => {
            engine
                .record_offline_payment(
                    booking,
                    None,
                    amount,
                    "PLN",
                    PaymentKind::Rental,
                    PaymentMethod::Offline,
                    approver,
                    notes,
                )
                .map_err(|e| e.to_string())?;
        }
        Operation::CancelPayment { payment, approver } => {
            engine
                .cancel_payment(payment, approver)
                .map_err(|e| e.to_string())?;
        }
        Operation::PricingPreview {
            item,
            quantity,
            start_date,
            end_date,
        } => {
            let quote = engine
                .pricing_preview(item, start_date, end_date, quantity)
                .map_err(|e| e.to_string())?;
            info!(
                item,
                days = quote.duration_days,
                total = %quote.total_price,
                deposit = %quote.deposit_amount,
                "pricing preview"
            );
        }
        Operation::CheckAvailability {
            item,
            start_date,
            end_date,
        } => {
            let available = engine
                .available_units(item, start_date, end_date)
                .map_err(|e| e.to_string())?;
            info!(item, available, "availability check");
        }
    }
    Ok(())
}

/// Log a rejected operation and move on
pub(crate) fn log_operation_error(error: &str) {
    warn!("Operation rejected: {}", error);
}

/// Write the requested report from the engine's final state
pub(crate) fn write_report(
    engine: &RentalEngine,
    report: ReportKind,
    output: &mut dyn Write,
) -> Result<(), String> {
    match report {
        ReportKind::Bookings => {
            crate::io::csv_format::write_bookings_csv(&engine.bookings_snapshot(), output)
        }
        ReportKind::Payments => {
            crate::io::csv_format::write_payments_csv(&engine.payments_snapshot(), output)
        }
    }
}
