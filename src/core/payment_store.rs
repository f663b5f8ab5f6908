//! Concurrent payment storage
//!
//! Payments are stored by id in a `DashMap`, with a secondary index from
//! gateway reference to payment id so webhook notifications and client
//! polls can be routed without scanning. Unlike bookings, payments have no
//! cross-record consistency requirement, so the per-record entry guard is
//! enough isolation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::types::{BookingId, PaymentId, PaymentRecord, RentalError};

/// Concurrent payment storage
#[derive(Debug, Default)]
pub struct PaymentStore {
    payments: DashMap<PaymentId, PaymentRecord>,
    by_external_ref: DashMap<String, PaymentId>,
    next_id: AtomicU64,
}

impl PaymentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next payment id
    pub fn next_id(&self) -> PaymentId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Insert a new payment, indexing its gateway reference if it has one
    pub fn insert(&self, payment: PaymentRecord) {
        if let Some(external_ref) = &payment.external_ref {
            self.by_external_ref
                .insert(external_ref.clone(), payment.id);
        }
        self.payments.insert(payment.id, payment);
    }

    /// Fetch a payment by id (snapshot copy)
    pub fn get(&self, payment: PaymentId) -> Option<PaymentRecord> {
        self.payments.get(&payment).map(|entry| entry.clone())
    }

    /// Resolve a gateway reference to a payment id
    pub fn find_by_external_ref(&self, external_ref: &str) -> Option<PaymentId> {
        self.by_external_ref.get(external_ref).map(|entry| *entry)
    }

    /// Mutate a payment under its entry lock and return the updated copy
    ///
    /// The closure works on a scratch copy; it is committed only when the
    /// closure returns `Ok`, so a rejected transition leaves the record
    /// exactly as it was.
    pub fn update<F>(&self, payment: PaymentId, f: F) -> Result<PaymentRecord, RentalError>
    where
        F: FnOnce(&mut PaymentRecord) -> Result<(), RentalError>,
    {
        let mut entry = self
            .payments
            .get_mut(&payment)
            .ok_or_else(|| RentalError::payment_not_found(payment))?;
        let mut updated = entry.clone();
        f(&mut updated)?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    /// Ids of live (pending/processing) attempts for a booking
    ///
    /// Used to supersede earlier attempts when a new intent is created, so
    /// at most one live attempt exists per booking.
    pub fn live_attempts_for(&self, booking: BookingId) -> Vec<PaymentId> {
        self.payments
            .iter()
            .filter(|entry| {
                entry.booking_id == Some(booking) && entry.status.is_live_attempt()
            })
            .map(|entry| entry.id)
            .collect()
    }

    /// All payments, sorted by id for deterministic output
    pub fn snapshot(&self) -> Vec<PaymentRecord> {
        let mut payments: Vec<PaymentRecord> =
            self.payments.iter().map(|entry| entry.clone()).collect();
        payments.sort_by_key(|p| p.id);
        payments
    }
}
