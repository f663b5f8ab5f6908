//! Booking types and lifecycle state machine
//!
//! This module defines the `Booking` record, its status enum, and the
//! single central transition table that governs every status change. All
//! legality checks go through [`BookingStatus::transition`]; call sites
//! never compare statuses ad hoc to decide whether an operation is legal.
//!
//! # Interval semantics
//!
//! Booking windows are half-open: `[start_date, end_date)`. The end date
//! itself is not part of the occupied period, so a booking ending on
//! June 8 and another starting on June 8 do not overlap and can share the
//! same unit back to back.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::UserId;
use super::item::ItemId;

/// Booking identifier, assigned sequentially by the booking store
pub type BookingId = u64;

/// Booking lifecycle states
///
/// The happy path is `Requested -> Confirmed -> Active -> Completed`;
/// `Requested` and `Confirmed` bookings may also be cancelled. "Overdue"
/// is deliberately not a state: it is the derived predicate
/// [`Booking::is_overdue`], so it can never go stale in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created, awaiting payment confirmation. Already reserves stock so
    /// that racing confirmations cannot oversell the window.
    Requested,

    /// Payment settled; the reservation is firm.
    Confirmed,

    /// Equipment handed over to the requester.
    Active,

    /// Equipment returned; terminal.
    Completed,

    /// Withdrawn before activation; terminal.
    Cancelled,
}

/// Events that drive booking status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    /// Payment settled (gateway completion or offline approval)
    Confirm,
    /// Equipment handed over
    Activate,
    /// Equipment returned (allowed straight from `Confirmed` since
    /// operators frequently skip the explicit activation step)
    Complete,
    /// Booking withdrawn
    Cancel,
}

impl BookingStatus {
    /// The central transition table: `(current, event) -> Option<next>`
    ///
    /// Returns `None` when the event is illegal for the current state.
    /// This is the only place in the crate that encodes booking lifecycle
    /// legality.
    pub fn transition(self, event: BookingEvent) -> Option<BookingStatus> {
        use BookingEvent::*;
        use BookingStatus::*;

        match (self, event) {
            (Requested, Confirm) => Some(Confirmed),
            (Confirmed, Activate) => Some(Active),
            (Confirmed, Complete) | (Active, Complete) => Some(Completed),
            (Requested, Cancel) | (Confirmed, Cancel) => Some(Cancelled),
            _ => None,
        }
    }

    /// Whether this status counts against available stock
    ///
    /// `Requested` holds also reserve stock: a pending booking must not be
    /// oversold by a racing confirmation on the same window.
    pub fn reserves_stock(self) -> bool {
        matches!(
            self,
            BookingStatus::Requested | BookingStatus::Confirmed | BookingStatus::Active
        )
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Lowercase name as stored in CSV output
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rental booking
///
/// Owned by the booking lifecycle; mutated only through defined
/// transitions. Never deleted: cancelled and completed bookings remain as
/// historical records but stop reserving stock.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// The booking ID
    pub id: BookingId,

    /// The booked item
    pub item_id: ItemId,

    /// The requesting user (opaque identity reference)
    pub requester: UserId,

    /// First occupied day
    pub start_date: NaiveDate,

    /// First free day (exclusive bound of the occupied window)
    pub end_date: NaiveDate,

    /// Units reserved (positive)
    pub quantity: u32,

    /// Current lifecycle state
    pub status: BookingStatus,

    /// Price per day per unit, frozen at creation time
    pub unit_price: Decimal,

    /// `unit_price * duration_days * quantity`
    ///
    /// The deposit is tracked separately and is not folded in.
    pub total_price: Decimal,

    /// Refundable security deposit (20% of the daily rate per unit)
    pub deposit_amount: Decimal,

    /// Day the equipment actually came back, set on completion
    pub actual_return_date: Option<NaiveDate>,

    /// Free-form requester notes
    pub notes: Option<String>,

    /// Notes attached by privileged actors
    pub admin_notes: Option<String>,

    /// Where the equipment is picked up
    pub pickup_address: Option<String>,

    /// Where the equipment is returned
    pub return_address: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open interval overlap test against `[start, end)`
    ///
    /// The standard four-way check reduced to two comparisons:
    /// `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date < end && start < self.end_date
    }

    /// Booked duration in days (at least 1 by construction)
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Derived overdue predicate
    ///
    /// A booking is overdue when it still holds equipment (`Confirmed` or
    /// `Active`) and today is past its return day.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            BookingStatus::Confirmed | BookingStatus::Active
        ) && today > self.end_date
    }
}
