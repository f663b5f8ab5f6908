//! Error types for the rental engine
//!
//! This module defines all error types that can occur during booking and
//! payment processing. Errors are designed to carry enough context to render
//! a user-facing message without consulting any other state.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: File not found, permission denied, etc.
//! - **CSV Parsing Errors**: Malformed CSV, invalid data types, etc.
//! - **Request Errors**: Malformed dates, non-positive quantities/amounts
//! - **Availability Errors**: Insufficient stock, capacity exceeded, quota
//! - **Lifecycle Errors**: Operations illegal for the current state
//! - **Gateway Errors**: Failures reported by the payment gateway collaborator

use rust_decimal::Decimal;
use thiserror::Error;

use super::booking::{BookingId, BookingStatus};
use super::item::ItemId;
use super::payment::{PaymentId, PaymentStatus};

/// Requester/approver identifier supplied by the identity collaborator
pub type UserId = u32;

/// Main error type for the rental engine
///
/// This enum represents all possible errors that can occur while checking
/// availability, pricing, or driving booking/payment lifecycles. All variants
/// except `IoError` and `ParseError` are recoverable: the operation is
/// rejected and no state changes are observable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RentalError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    ///
    /// This is typically a fatal error (file permissions, disk full, etc.).
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped
    /// and processing continues with the next record.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The referenced item does not exist or is retired
    #[error("Item {item} not found")]
    ItemNotFound {
        /// The item id that was not found
        item: ItemId,
    },

    /// The referenced booking does not exist
    #[error("Booking {booking} not found")]
    BookingNotFound {
        /// The booking id that was not found
        booking: BookingId,
    },

    /// The referenced payment does not exist
    #[error("Payment {payment} not found")]
    PaymentNotFound {
        /// The payment id that was not found
        payment: PaymentId,
    },

    /// No payment record carries the given gateway reference
    ///
    /// Raised when a gateway notification or poll references a transaction
    /// the engine never created. Recoverable - the notification is dropped.
    #[error("No payment found for gateway reference '{external_ref}'")]
    UnknownExternalReference {
        /// The unrecognized gateway transaction reference
        external_ref: String,
    },

    /// Malformed request (dates, quantity, permissions)
    ///
    /// This is a recoverable error - the caller adjusts parameters and
    /// retries; no state was changed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what was malformed
        message: String,
    },

    /// Not enough free units in the requested window
    ///
    /// Carries the actual free quantity so the caller can display it.
    /// Recoverable - the caller picks another window or quantity.
    #[error("Only {available} unit(s) of item {item} available in the requested window (requested {requested})")]
    InsufficientAvailability {
        /// The item that was requested
        item: ItemId,
        /// Units requested
        requested: u32,
        /// Units actually free in the window
        available: u32,
    },

    /// The request exceeds the item's total stock
    ///
    /// No amount of time-shifting can satisfy such a request, so this is
    /// reported separately from a window-specific shortage.
    #[error("Requested {requested} unit(s) of item {item} but only {total_stock} exist in total")]
    CapacityExceeded {
        /// The item that was requested
        item: ItemId,
        /// Units requested
        requested: u32,
        /// Total physical stock of the item
        total_stock: u32,
    },

    /// The requester already holds the maximum number of open bookings
    #[error("Requester {requester} already holds {held} open booking(s) (limit {limit})")]
    QuotaExceeded {
        /// The requester that hit the cap
        requester: UserId,
        /// Open bookings currently held
        held: usize,
        /// The configured cap
        limit: usize,
    },

    /// Booking operation illegal for the current lifecycle state
    #[error("Cannot {operation} booking {booking} in state '{current}'")]
    BookingInvalidState {
        /// The booking the operation targeted
        booking: BookingId,
        /// Its current status
        current: BookingStatus,
        /// The operation that was attempted
        operation: String,
    },

    /// Payment operation illegal for the current lifecycle state
    #[error("Cannot {operation} payment {payment} in state '{current}'")]
    PaymentInvalidState {
        /// The payment the operation targeted
        payment: PaymentId,
        /// Its current status
        current: PaymentStatus,
        /// The operation that was attempted
        operation: String,
    },

    /// The payment already reached a success state
    ///
    /// Offline approval is rejected once a payment is `Completed` or
    /// `ApprovedOffline`; the two success paths are mutually exclusive.
    #[error("Payment {payment} has already been approved")]
    AlreadyApproved {
        /// The payment that was already settled
        payment: PaymentId,
    },

    /// Non-positive or otherwise unusable monetary amount
    #[error("Invalid amount {amount} for payment operation")]
    InvalidAmount {
        /// The offending amount
        amount: Decimal,
    },

    /// The payment gateway collaborator reported a failure
    ///
    /// `fallback_applied` records whether a local state was applied in
    /// place of the gateway-side outcome (e.g. a refund failure that was
    /// settled as a local cancellation).
    #[error("Payment gateway error: {message}{}", if *fallback_applied { " (local fallback applied)" } else { "" })]
    GatewayError {
        /// Description of the gateway failure
        message: String,
        /// Whether a local fallback state was applied
        fallback_applied: bool,
    },
}

// Conversion from io::Error to RentalError
impl From<std::io::Error> for RentalError {
    fn from(error: std::io::Error) -> Self {
        RentalError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to RentalError
impl From<csv::Error> for RentalError {
    fn from(error: csv::Error) -> Self {
        // Extract line number if available
        let line = error.position().map(|pos| pos.line());

        RentalError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl RentalError {
    /// Create an ItemNotFound error
    pub fn item_not_found(item: ItemId) -> Self {
        RentalError::ItemNotFound { item }
    }

    /// Create a BookingNotFound error
    pub fn booking_not_found(booking: BookingId) -> Self {
        RentalError::BookingNotFound { booking }
    }

    /// Create a PaymentNotFound error
    pub fn payment_not_found(payment: PaymentId) -> Self {
        RentalError::PaymentNotFound { payment }
    }

    /// Create an UnknownExternalReference error
    pub fn unknown_external_reference(external_ref: &str) -> Self {
        RentalError::UnknownExternalReference {
            external_ref: external_ref.to_string(),
        }
    }

    /// Create an InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        RentalError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an InsufficientAvailability error
    pub fn insufficient_availability(item: ItemId, requested: u32, available: u32) -> Self {
        RentalError::InsufficientAvailability {
            item,
            requested,
            available,
        }
    }

    /// Create a CapacityExceeded error
    pub fn capacity_exceeded(item: ItemId, requested: u32, total_stock: u32) -> Self {
        RentalError::CapacityExceeded {
            item,
            requested,
            total_stock,
        }
    }

    /// Create a QuotaExceeded error
    pub fn quota_exceeded(requester: UserId, held: usize, limit: usize) -> Self {
        RentalError::QuotaExceeded {
            requester,
            held,
            limit,
        }
    }

    /// Create a BookingInvalidState error
    pub fn booking_invalid_state(
        booking: BookingId,
        current: BookingStatus,
        operation: &str,
    ) -> Self {
        RentalError::BookingInvalidState {
            booking,
            current,
            operation: operation.to_string(),
        }
    }

    /// Create a PaymentInvalidState error
    pub fn payment_invalid_state(
        payment: PaymentId,
        current: PaymentStatus,
        operation: &str,
    ) -> Self {
        RentalError::PaymentInvalidState {
            payment,
            current,
            operation: operation.to_string(),
        }
    }

    /// Create an AlreadyApproved error
    pub fn already_approved(payment: PaymentId) -> Self {
        RentalError::AlreadyApproved { payment }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        RentalError::InvalidAmount { amount }
    }

    /// Create a GatewayError without a local fallback
    pub fn gateway_error(message: impl Into<String>) -> Self {
        RentalError::GatewayError {
            message: message.into(),
            fallback_applied: false,
        }
    }

    /// Create a GatewayError after a local fallback state was applied
    pub fn gateway_error_with_fallback(message: impl Into<String>) -> Self {
        RentalError::GatewayError {
            message: message.into(),
            fallback_applied: true,
        }
    }
}
