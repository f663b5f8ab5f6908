//! The rental engine facade
//!
//! [`RentalEngine`] wires the stores, the two lifecycle managers, and the
//! reconciliation coordinator together behind one API. Callers (the CLI
//! strategies, embedding services, tests) talk only to the facade; the
//! coupling between payment outcomes and booking transitions happens here
//! and nowhere else.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::availability::AvailabilityEngine;
use crate::core::booking_manager::{
    ActorRole, BookingManager, BookingPolicy, BookingRequest, BookingUpdate,
};
use crate::core::booking_store::BookingStore;
use crate::core::payment_manager::{CancelOutcome, IntentReceipt, PaymentManager, SyncOutcome};
use crate::core::payment_store::PaymentStore;
use crate::core::pricing::PricingQuote;
use crate::core::reconciliation::{ReconciliationAction, ReconciliationCoordinator};
use crate::core::traits::{Catalog, Clock, PaymentGateway};
use crate::types::{
    Booking, BookingId, ItemId, PaymentId, PaymentKind, PaymentMethod, PaymentRecord, RentalError,
    UserId,
};

/// A payment operation's result together with any booking transition it
/// triggered
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The payment after the operation
    pub payment: PaymentRecord,
    /// What reconciliation did to the linked booking
    pub action: ReconciliationAction,
}

/// Facade over the booking and payment lifecycles
pub struct RentalEngine {
    bookings: BookingManager,
    payments: PaymentManager,
    coordinator: ReconciliationCoordinator,
    availability: Arc<AvailabilityEngine>,
    booking_store: Arc<BookingStore>,
    payment_store: Arc<PaymentStore>,
    clock: Arc<dyn Clock>,
}

impl RentalEngine {
    /// Assemble an engine from its collaborators
    pub fn new(
        catalog: Arc<dyn Catalog>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        policy: BookingPolicy,
    ) -> Self {
        let booking_store = Arc::new(BookingStore::new());
        let payment_store = Arc::new(PaymentStore::new());
        let availability = Arc::new(AvailabilityEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&booking_store),
        ));
        let bookings = BookingManager::new(
            Arc::clone(&booking_store),
            Arc::clone(&availability),
            Arc::clone(&clock),
            policy,
        );
        let payments = PaymentManager::new(
            Arc::clone(&payment_store),
            gateway,
            Arc::clone(&clock),
        );

        Self {
            bookings,
            payments,
            coordinator: ReconciliationCoordinator::new(),
            availability,
            booking_store,
            payment_store,
            clock,
        }
    }

    // --- bookings ---

    /// Create a booking (see [`BookingManager::create`])
    pub fn create_booking(&self, request: BookingRequest) -> Result<Booking, RentalError> {
        self.bookings.create(request)
    }

    /// Confirm a requested booking directly (manual confirmation path)
    pub fn confirm_booking(&self, booking: BookingId) -> Result<Booking, RentalError> {
        self.bookings.confirm(booking)
    }

    /// Cancel a requested or confirmed booking
    pub fn cancel_booking(&self, booking: BookingId) -> Result<Booking, RentalError> {
        self.bookings.cancel(booking)
    }

    /// Mark a confirmed booking active (equipment handed over)
    pub fn activate_booking(&self, booking: BookingId) -> Result<Booking, RentalError> {
        self.bookings.activate(booking)
    }

    /// Complete a booking, recording the return date
    pub fn complete_booking(
        &self,
        booking: BookingId,
        actual_return_date: Option<NaiveDate>,
    ) -> Result<Booking, RentalError> {
        self.bookings.complete(booking, actual_return_date)
    }

    /// Update a booking's mutable details
    pub fn update_booking_details(
        &self,
        booking: BookingId,
        actor: UserId,
        role: ActorRole,
        update: BookingUpdate,
    ) -> Result<Booking, RentalError> {
        self.bookings.update_details(booking, actor, role, update)
    }

    /// Fetch a booking
    pub fn booking(&self, booking: BookingId) -> Result<Booking, RentalError> {
        self.bookings.get(booking)
    }

    /// Whether a booking is past its end date without having been returned
    pub fn booking_is_overdue(&self, booking: BookingId) -> Result<bool, RentalError> {
        Ok(self.bookings.get(booking)?.is_overdue(self.clock.today()))
    }

    /// Price a window without creating anything
    pub fn pricing_preview(
        &self,
        item: ItemId,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Result<PricingQuote, RentalError> {
        self.bookings.pricing_preview(item, start, end, quantity)
    }

    /// Units of an item free over `[start, end)`
    pub fn available_units(
        &self,
        item: ItemId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, RentalError> {
        self.availability.available_units(item, start, end)
    }

    // --- payments ---

    /// Create a gateway payment intent
    ///
    /// When the intent settles a booking, the amount defaults to the
    /// booking's rental total and the payer to its requester; explicit
    /// arguments override both (a deposit charge, a third-party payer).
    pub fn create_payment_intent(
        &self,
        booking: Option<BookingId>,
        payer: Option<UserId>,
        amount: Option<Decimal>,
        currency: &str,
        kind: PaymentKind,
        description: Option<String>,
    ) -> Result<IntentReceipt, RentalError> {
        let (payer, amount) = self.resolve_payer_and_amount(booking, payer, amount)?;
        self.payments
            .create_gateway_intent(payer, booking, amount, currency, kind, description)
    }

    /// Pull a gateway intent's status and reconcile the linked booking
    ///
    /// Only the sync that first moves the payment into `Completed`
    /// triggers reconciliation; repeats are no-ops end to end.
    pub fn sync_payment(&self, external_ref: &str) -> Result<PaymentOutcome, RentalError> {
        let SyncOutcome {
            payment,
            newly_completed,
        } = self.payments.sync_from_gateway(external_ref)?;

        let action = if newly_completed {
            self.coordinator.on_payment_success(&payment, &self.bookings)?
        } else {
            ReconciliationAction::None
        };
        Ok(PaymentOutcome { payment, action })
    }

    /// Approve a payment offline and reconcile the linked booking
    pub fn approve_payment_offline(
        &self,
        payment: PaymentId,
        approver: UserId,
        notes: Option<String>,
    ) -> Result<PaymentOutcome, RentalError> {
        let payment = self.payments.approve_offline(payment, approver, notes)?;
        let action = self.coordinator.on_payment_success(&payment, &self.bookings)?;
        Ok(PaymentOutcome { payment, action })
    }

    /// Record an out-of-band settled payment and reconcile the linked
    /// booking
    pub fn record_offline_payment(
        &self,
        booking: Option<BookingId>,
        payer: Option<UserId>,
        amount: Option<Decimal>,
        currency: &str,
        kind: PaymentKind,
        method: PaymentMethod,
        approver: UserId,
        notes: Option<String>,
    ) -> Result<PaymentOutcome, RentalError> {
        let (payer, amount) = self.resolve_payer_and_amount(booking, payer, amount)?;
        let payment = self.payments.record_offline_payment(
            payer, booking, amount, currency, kind, method, approver, notes,
        )?;
        let action = self.coordinator.on_payment_success(&payment, &self.bookings)?;
        Ok(PaymentOutcome { payment, action })
    }

    /// Administratively cancel a payment, refunding through the gateway
    /// where applicable, and reconcile the linked booking
    pub fn cancel_payment(
        &self,
        payment: PaymentId,
        approver: UserId,
    ) -> Result<PaymentOutcome, RentalError> {
        let CancelOutcome { payment, .. } = self.payments.cancel_by_admin(payment, approver)?;
        let action = self.coordinator.on_payment_cancelled(&payment, &self.bookings)?;
        Ok(PaymentOutcome { payment, action })
    }

    /// Fetch a payment
    pub fn payment(&self, payment: PaymentId) -> Result<PaymentRecord, RentalError> {
        self.payments.get(payment)
    }

    // --- snapshots ---

    /// All bookings sorted by id
    pub fn bookings_snapshot(&self) -> Vec<Booking> {
        self.booking_store.snapshot()
    }

    /// All payments sorted by id
    pub fn payments_snapshot(&self) -> Vec<PaymentRecord> {
        self.payment_store.snapshot()
    }

    /// Today per the injected clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fill payer and amount from the linked booking when the caller left
    /// them implicit
    fn resolve_payer_and_amount(
        &self,
        booking: Option<BookingId>,
        payer: Option<UserId>,
        amount: Option<Decimal>,
    ) -> Result<(UserId, Decimal), RentalError> {
        match (payer, amount) {
            (Some(payer), Some(amount)) => Ok((payer, amount)),
            _ => {
                let booking_id = booking.ok_or_else(|| {
                    RentalError::invalid_request(
                        "payer and amount are required for a payment without a booking",
                    )
                })?;
                let b = self.bookings.get(booking_id)?;
                Ok((
                    payer.unwrap_or(b.requester),
                    amount.unwrap_or(b.total_price),
                ))
            }
        }
    }
}
