//! Core engine: stores, lifecycle managers, availability, pricing, and
//! the reconciliation coordinator

pub mod availability;
pub mod booking_manager;
pub mod booking_store;
pub mod engine;
pub mod inmemory;
pub mod payment_manager;
pub mod payment_store;
pub mod pricing;
pub mod reconciliation;
pub mod traits;

pub use availability::AvailabilityEngine;
pub use booking_manager::{ActorRole, BookingManager, BookingPolicy, BookingRequest, BookingUpdate};
pub use booking_store::BookingStore;
pub use engine::{PaymentOutcome, RentalEngine};
pub use inmemory::{FixedClock, InMemoryCatalog, ScriptedGateway, SystemClock};
pub use payment_manager::{
    CancelOutcome, IntentReceipt, PaymentManager, RefundDisposition, SyncOutcome,
};
pub use payment_store::PaymentStore;
pub use pricing::{PricingCalculator, PricingQuote};
pub use reconciliation::{ReconciliationAction, ReconciliationCoordinator};
pub use traits::{Catalog, Clock, GatewayIntent, IntentMetadata, PaymentGateway};
