//! Payment/booking reconciliation
//!
//! The payment and booking lifecycles are independent state machines; this
//! coordinator is the only place that couples them. It reacts to payment
//! outcomes and nudges the linked booking when, and only when, the booking
//! is in the one state where the outcome is meaningful:
//!
//! - payment settles successfully and the booking is still `Requested`
//!   -> confirm it
//! - payment is administratively cancelled and the booking is `Confirmed`
//!   -> cancel it
//!
//! Any other booking state makes the reaction a deliberate no-op. That is
//! what makes duplicate gateway notifications, late syncs, and manual
//! interleavings safe: the second delivery finds the booking already moved
//! on and does nothing.

use tracing::{debug, info, warn};

use crate::core::booking_manager::BookingManager;
use crate::types::{BookingId, BookingStatus, PaymentRecord, RentalError};

/// What the coordinator did in response to a payment outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationAction {
    /// The payment carried no booking, or the booking was not in a state
    /// the outcome applies to
    None,
    /// The booking was confirmed
    BookingConfirmed(BookingId),
    /// The booking was cancelled
    BookingCancelled(BookingId),
}

/// Couples payment outcomes to booking transitions
#[derive(Debug, Default)]
pub struct ReconciliationCoordinator;

impl ReconciliationCoordinator {
    /// Create a coordinator
    pub fn new() -> Self {
        Self
    }

    /// React to a payment reaching a success state
    ///
    /// Confirms the linked booking if it is still exactly `Requested`.
    /// A booking in any other state is left alone: it was already paid
    /// for, manually confirmed, cancelled in the meantime, or never
    /// existed on this payment at all.
    ///
    /// # Errors
    ///
    /// Propagates availability failures from the confirm re-check; a
    /// booking whose stock evaporated between request and payment
    /// surfaces as `InsufficientAvailability` so the operator sees it.
    pub fn on_payment_success(
        &self,
        payment: &PaymentRecord,
        bookings: &BookingManager,
    ) -> Result<ReconciliationAction, RentalError> {
        let Some(booking_id) = payment.booking_id else {
            return Ok(ReconciliationAction::None);
        };

        let booking = bookings.get(booking_id)?;
        if booking.status != BookingStatus::Requested {
            debug!(
                payment = payment.id,
                booking = booking_id,
                status = %booking.status,
                "payment success needs no booking action"
            );
            return Ok(ReconciliationAction::None);
        }

        bookings.confirm(booking_id)?;
        info!(
            payment = payment.id,
            booking = booking_id,
            "booking confirmed by payment"
        );
        Ok(ReconciliationAction::BookingConfirmed(booking_id))
    }

    /// React to a payment being administratively cancelled or refunded
    ///
    /// Cancels the linked booking if it is exactly `Confirmed` - the state
    /// the payment's success put it in. A `Requested` booking never had
    /// its payment land, an `Active` one has equipment in the field, and
    /// terminal ones are done; all are left alone.
    pub fn on_payment_cancelled(
        &self,
        payment: &PaymentRecord,
        bookings: &BookingManager,
    ) -> Result<ReconciliationAction, RentalError> {
        let Some(booking_id) = payment.booking_id else {
            return Ok(ReconciliationAction::None);
        };

        let booking = bookings.get(booking_id)?;
        if booking.status != BookingStatus::Confirmed {
            debug!(
                payment = payment.id,
                booking = booking_id,
                status = %booking.status,
                "payment cancellation needs no booking action"
            );
            return Ok(ReconciliationAction::None);
        }

        bookings.cancel(booking_id)?;
        warn!(
            payment = payment.id,
            booking = booking_id,
            "booking cancelled because its payment was withdrawn"
        );
        Ok(ReconciliationAction::BookingCancelled(booking_id))
    }
}
