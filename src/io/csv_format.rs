//! CSV format handling for the operation script, the catalog, and report
//! output
//!
//! This module centralizes all CSV format concerns:
//! - `CsvRecord` / `CatalogRecord` structures for deserialization
//! - Conversion from CSV records to [`Operation`] values
//! - Booking and payment report serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use std::io::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{
    Booking, BookingId, GatewayPaymentStatus, Item, ItemId, PaymentId, PaymentKind, PaymentRecord,
    UserId,
};

/// One row of the operation script
///
/// Every column except `op` is optional; each operation requires its own
/// subset. Empty fields deserialize as `None`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    pub item: Option<ItemId>,
    pub booking: Option<BookingId>,
    pub payment: Option<PaymentId>,
    pub user: Option<UserId>,
    pub quantity: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub amount: Option<String>,
    pub external_ref: Option<String>,
    pub gateway_status: Option<String>,
    pub notes: Option<String>,
}

/// One row of the catalog file
///
/// Columns: `item,name,total_stock,daily_rate,active`. The `active` column
/// may be omitted and defaults to true.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogRecord {
    pub item: ItemId,
    pub name: String,
    pub total_stock: u32,
    pub daily_rate: String,
    pub active: Option<bool>,
}

/// A parsed operation, ready for the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateBooking {
        item: ItemId,
        user: UserId,
        quantity: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        notes: Option<String>,
    },
    ConfirmBooking {
        booking: BookingId,
    },
    CancelBooking {
        booking: BookingId,
    },
    ActivateBooking {
        booking: BookingId,
    },
    CompleteBooking {
        booking: BookingId,
        /// Actual return date; carried in the `end_date` column
        return_date: Option<NaiveDate>,
    },
    CreateIntent {
        booking: Option<BookingId>,
        user: Option<UserId>,
        amount: Option<Decimal>,
        kind: PaymentKind,
        notes: Option<String>,
    },
    /// Script the fake gateway's answer for a reference (test harness
    /// operation, handled by the strategy rather than the engine)
    GatewayStatus {
        external_ref: String,
        status: GatewayPaymentStatus,
    },
    SyncGateway {
        external_ref: String,
    },
    ApproveOffline {
        payment: PaymentId,
        approver: UserId,
        notes: Option<String>,
    },
    OfflinePayment {
        booking: Option<BookingId>,
        amount: Option<Decimal>,
        approver: UserId,
        notes: Option<String>,
    },
    CancelPayment {
        payment: PaymentId,
        approver: UserId,
    },
    PricingPreview {
        item: ItemId,
        quantity: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    CheckAvailability {
        item: ItemId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

fn require<T>(value: Option<T>, column: &str, op: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("'{}' operation requires the '{}' column", op, column))
}

fn parse_amount(amount: Option<String>) -> Result<Option<Decimal>, String> {
    match amount {
        Some(s) if !s.trim().is_empty() => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|_| format!("Invalid amount '{}'", s)),
        _ => Ok(None),
    }
}

/// Convert a deserialized row to an [`Operation`]
///
/// Validates that the columns each operation needs are present and parses
/// the amount and gateway status fields.
pub fn convert_csv_record(record: CsvRecord) -> Result<Operation, String> {
    let op = record.op.to_lowercase();
    match op.as_str() {
        "create_booking" => Ok(Operation::CreateBooking {
            item: require(record.item, "item", &op)?,
            user: require(record.user, "user", &op)?,
            quantity: require(record.quantity, "quantity", &op)?,
            start_date: require(record.start_date, "start_date", &op)?,
            end_date: require(record.end_date, "end_date", &op)?,
            notes: record.notes,
        }),
        "confirm_booking" => Ok(Operation::ConfirmBooking {
            booking: require(record.booking, "booking", &op)?,
        }),
        "cancel_booking" => Ok(Operation::CancelBooking {
            booking: require(record.booking, "booking", &op)?,
        }),
        "activate_booking" => Ok(Operation::ActivateBooking {
            booking: require(record.booking, "booking", &op)?,
        }),
        "complete_booking" => Ok(Operation::CompleteBooking {
            booking: require(record.booking, "booking", &op)?,
            return_date: record.end_date,
        }),
        "create_intent" | "create_deposit_intent" => Ok(Operation::CreateIntent {
            booking: record.booking,
            user: record.user,
            amount: parse_amount(record.amount)?,
            kind: if op == "create_deposit_intent" {
                PaymentKind::Deposit
            } else {
                PaymentKind::Rental
            },
            notes: record.notes,
        }),
        "gateway_status" => {
            let status_str = require(record.gateway_status, "gateway_status", &op)?;
            let status = GatewayPaymentStatus::from_str(&status_str)?;
            Ok(Operation::GatewayStatus {
                external_ref: require(record.external_ref, "external_ref", &op)?,
                status,
            })
        }
        "sync_gateway" => Ok(Operation::SyncGateway {
            external_ref: require(record.external_ref, "external_ref", &op)?,
        }),
        "approve_offline" => Ok(Operation::ApproveOffline {
            payment: require(record.payment, "payment", &op)?,
            approver: require(record.user, "user", &op)?,
            notes: record.notes,
        }),
        "offline_payment" => Ok(Operation::OfflinePayment {
            booking: record.booking,
            amount: parse_amount(record.amount)?,
            approver: require(record.user, "user", &op)?,
            notes: record.notes,
        }),
        "cancel_payment" => Ok(Operation::CancelPayment {
            payment: require(record.payment, "payment", &op)?,
            approver: require(record.user, "user", &op)?,
        }),
        "pricing_preview" => Ok(Operation::PricingPreview {
            item: require(record.item, "item", &op)?,
            quantity: require(record.quantity, "quantity", &op)?,
            start_date: require(record.start_date, "start_date", &op)?,
            end_date: require(record.end_date, "end_date", &op)?,
        }),
        "check_availability" => Ok(Operation::CheckAvailability {
            item: require(record.item, "item", &op)?,
            start_date: require(record.start_date, "start_date", &op)?,
            end_date: require(record.end_date, "end_date", &op)?,
        }),
        other => Err(format!("Invalid operation: '{}'", other)),
    }
}

/// Convert a catalog row to an [`Item`]
pub fn convert_catalog_record(record: CatalogRecord) -> Result<Item, String> {
    let daily_rate = Decimal::from_str(record.daily_rate.trim())
        .map_err(|_| format!("Invalid daily rate '{}' for item {}", record.daily_rate, record.item))?;
    if daily_rate < Decimal::ZERO {
        return Err(format!("Negative daily rate for item {}", record.item));
    }

    Ok(Item {
        id: record.item,
        name: record.name,
        daily_rate,
        total_stock: record.total_stock,
        is_active: record.active.unwrap_or(true),
    })
}

/// Write the booking report
///
/// Columns: `booking,item,requester,status,quantity,start_date,end_date,`
/// `unit_price,total_price,deposit,return_date`. Prices use two decimal
/// places; the input slice is expected to be sorted by id already.
pub fn write_bookings_csv(bookings: &[Booking], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "booking",
            "item",
            "requester",
            "status",
            "quantity",
            "start_date",
            "end_date",
            "unit_price",
            "total_price",
            "deposit",
            "return_date",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for booking in bookings {
        writer
            .write_record(&[
                booking.id.to_string(),
                booking.item_id.to_string(),
                booking.requester.to_string(),
                booking.status.to_string(),
                booking.quantity.to_string(),
                booking.start_date.to_string(),
                booking.end_date.to_string(),
                format!("{:.2}", booking.unit_price),
                format!("{:.2}", booking.total_price),
                format!("{:.2}", booking.deposit_amount),
                booking
                    .actual_return_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write booking record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;
    Ok(())
}

/// Write the payment report
///
/// Columns: `payment,booking,payer,amount,kind,method,status,external_ref,`
/// `approved_by,failure_reason`.
pub fn write_payments_csv(payments: &[PaymentRecord], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "payment",
            "booking",
            "payer",
            "amount",
            "kind",
            "method",
            "status",
            "external_ref",
            "approved_by",
            "failure_reason",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for payment in payments {
        let kind = match payment.kind {
            PaymentKind::Rental => "rental",
            PaymentKind::Deposit => "deposit",
        };
        let method = match payment.method {
            crate::types::PaymentMethod::Gateway => "gateway",
            crate::types::PaymentMethod::Offline => "offline",
            crate::types::PaymentMethod::BankTransfer => "bank_transfer",
        };
        writer
            .write_record(&[
                payment.id.to_string(),
                payment.booking_id.map(|b| b.to_string()).unwrap_or_default(),
                payment.payer.to_string(),
                format!("{:.2}", payment.amount),
                kind.to_string(),
                method.to_string(),
                payment.status.to_string(),
                payment.external_ref.clone().unwrap_or_default(),
                payment
                    .approved_by
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                payment.failure_reason.clone().unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write payment record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;
    Ok(())
}
