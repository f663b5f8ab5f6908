//! Collaborator traits for the rental engine
//!
//! The engine treats the catalog, the payment gateway, and the wall clock
//! as injected collaborators behind these traits. Production deployments
//! supply real implementations; the CLI and tests use the in-memory ones
//! from [`crate::core::inmemory`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::types::{BookingId, GatewayPaymentStatus, Item, ItemId, RentalError, UserId};

/// Read access to the equipment catalog
///
/// The engine never mutates catalog data; it only looks items up to learn
/// their total stock, daily rate, and active flag.
pub trait Catalog: Send + Sync {
    /// Fetch an item by id
    ///
    /// Returns `None` for unknown ids. Retired items are returned as-is;
    /// callers filter on `is_active`.
    fn get_item(&self, id: ItemId) -> Option<Item>;
}

/// Handle returned by the gateway when an intent is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIntent {
    /// Gateway-side transaction reference (payment-intent id)
    pub external_ref: String,
    /// Client-confirmable secret handed to the payer's frontend
    pub client_handle: String,
}

/// Metadata attached to a gateway intent for back-reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    /// The booking this intent settles, if any
    pub booking_id: Option<BookingId>,
    /// The paying user
    pub payer: UserId,
}

/// The external payment gateway
///
/// Status vocabulary crossing this boundary is gateway-defined
/// ([`GatewayPaymentStatus`]); the mapping to local payment statuses lives
/// in exactly one place, `GatewayPaymentStatus::to_local`.
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent and return its reference and client handle
    fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, RentalError>;

    /// Retrieve the gateway's current status for an intent
    fn retrieve_status(&self, external_ref: &str) -> Result<GatewayPaymentStatus, RentalError>;

    /// Refund a completed intent
    fn refund(&self, external_ref: &str) -> Result<(), RentalError>;
}

/// Source of "now", injected so date validation is testable and CLI runs
/// are reproducible
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day (used for "start not in the past" checks)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
