//! Rental Engine Library
//! # Overview
//!
//! This library provides an equipment-rental booking-availability engine
//! and a rental/payment reconciliation state machine, with a streaming
//! CSV pipeline offering both a sync and an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Item, Booking, PaymentRecord, errors) and
//!   the two lifecycle transition tables
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - The facade wiring everything together
//!   - [`core::availability`] - Computed per-window stock availability
//!   - [`core::booking_manager`] / [`core::payment_manager`] - The two
//!     lifecycle drivers
//!   - [`core::reconciliation`] - The only coupling between them
//! - [`io`] - CSV parsing and report output with pluggable strategies
//!
//! # Availability Model
//!
//! Booking windows are half-open `[start, end)` date intervals; a booking
//! ending on a day does not collide with one starting that day. Free stock
//! for a window is always computed as total stock minus the quantities of
//! overlapping bookings in stock-reserving states (requested, confirmed,
//! active) - never tracked as a counter.
//!
//! # Reconciliation
//!
//! A payment settling successfully (gateway completion or manual offline
//! approval) confirms its booking if the booking is still requested; an
//! administrative payment cancellation cancels the booking if it is
//! confirmed. Everything else is a no-op, which makes duplicate gateway
//! notifications harmless.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AvailabilityEngine, BookingManager, BookingPolicy, BookingRequest, PaymentManager,
    PricingCalculator, ReconciliationCoordinator, RentalEngine,
};
pub use io::{write_bookings_csv, write_payments_csv, Operation};
pub use types::{
    Booking, BookingId, BookingStatus, GatewayPaymentStatus, Item, ItemId, PaymentId,
    PaymentRecord, PaymentStatus, RentalError, UserId,
};
