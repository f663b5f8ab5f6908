//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `item`: Catalog item snapshot and identifiers
//! - `booking`: Booking record and lifecycle state machine
//! - `payment`: Payment record, lifecycle state machine, gateway vocabulary
//! - `error`: Error types for the rental engine

pub mod booking;
pub mod error;
pub mod item;
pub mod payment;

pub use booking::{Booking, BookingEvent, BookingId, BookingStatus};
pub use error::{RentalError, UserId};
pub use item::{Item, ItemId};
pub use payment::{
    GatewayPaymentStatus, PaymentEvent, PaymentId, PaymentKind, PaymentMethod, PaymentRecord,
    PaymentStatus,
};
