//! Booking lifecycle management
//!
//! This module drives every booking state change: creation, confirmation,
//! activation, completion, cancellation, and detail updates. Transitions
//! are validated through the central table in
//! [`BookingStatus::transition`]; availability-gated transitions run their
//! re-check *inside* the item's entry lock so check-then-write is atomic
//! per item.
//!
//! Stock is never adjusted as a counter. A booking enters the
//! stock-reserving set exactly once (on creation, state `Requested`) and
//! leaves it exactly once (on cancellation or completion); everything else
//! is derived by the availability scan.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::core::availability::AvailabilityEngine;
use crate::core::booking_store::BookingStore;
use crate::core::pricing::{PricingCalculator, PricingQuote};
use crate::core::traits::Clock;
use crate::types::{
    Booking, BookingEvent, BookingId, BookingStatus, ItemId, RentalError, UserId,
};

/// Validation limits for booking creation
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Shortest allowed rental, in days
    pub min_duration_days: i64,
    /// Longest allowed rental, in days
    pub max_duration_days: i64,
    /// Maximum bookings one requester may hold in stock-reserving states
    pub max_held_per_requester: usize,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_duration_days: 1,
            max_duration_days: 90,
            max_held_per_requester: 100,
        }
    }
}

/// Caller role as reported by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    /// Regular requester
    Ordinary,
    /// Administrator-equivalent
    Privileged,
}

/// Parameters for creating a booking
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// The item to book
    pub item_id: ItemId,
    /// The requesting user
    pub requester: UserId,
    /// First occupied day
    pub start_date: NaiveDate,
    /// First free day (exclusive)
    pub end_date: NaiveDate,
    /// Units requested
    pub quantity: u32,
    /// Free-form requester notes
    pub notes: Option<String>,
    /// Where the equipment is picked up
    pub pickup_address: Option<String>,
    /// Where the equipment is returned
    pub return_address: Option<String>,
}

/// Partial update of a booking's mutable details
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    /// Requester notes
    pub notes: Option<String>,
    /// Pickup address
    pub pickup_address: Option<String>,
    /// Return address
    pub return_address: Option<String>,
    /// Privileged-only notes
    pub admin_notes: Option<String>,
}

/// Drives the booking state machine
pub struct BookingManager {
    store: Arc<BookingStore>,
    availability: Arc<AvailabilityEngine>,
    pricing: PricingCalculator,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl BookingManager {
    /// Create a manager over the given stores and collaborators
    pub fn new(
        store: Arc<BookingStore>,
        availability: Arc<AvailabilityEngine>,
        clock: Arc<dyn Clock>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            availability,
            pricing: PricingCalculator::new(),
            clock,
            policy,
        }
    }

    /// Fetch a booking by id
    pub fn get(&self, booking: BookingId) -> Result<Booking, RentalError> {
        self.store
            .get(booking)
            .ok_or_else(|| RentalError::booking_not_found(booking))
    }

    /// Create a new booking in state `Requested`
    ///
    /// Validates dates and the requester quota, checks availability, and
    /// prices the window. The availability evaluation and the insert run
    /// under the item's entry lock: two racing creates for contested stock
    /// serialize, and the loser observes the winner's reservation.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` (dates/quantity), `ItemNotFound`, `QuotaExceeded`,
    /// `CapacityExceeded`, or `InsufficientAvailability`.
    pub fn create(&self, request: BookingRequest) -> Result<Booking, RentalError> {
        self.validate_dates(request.start_date, request.end_date)?;

        let item = self.availability.active_item(request.item_id)?;

        // Quota runs before taking the item lock; scanning the store while
        // holding an entry guard would deadlock on the shard.
        let held = self.store.count_reserving_for(request.requester);
        if held >= self.policy.max_held_per_requester {
            return Err(RentalError::quota_exceeded(
                request.requester,
                held,
                self.policy.max_held_per_requester,
            ));
        }

        let quote = self.pricing.price(
            &item,
            request.start_date,
            request.end_date,
            request.quantity,
        )?;

        let store = Arc::clone(&self.store);
        let now = self.clock.now();
        let booking = self.store.with_item(request.item_id, |list| {
            AvailabilityEngine::evaluate(
                &item,
                list,
                request.quantity,
                request.start_date,
                request.end_date,
                None,
            )?;

            let booking = Booking {
                id: store.next_id(),
                item_id: request.item_id,
                requester: request.requester,
                start_date: request.start_date,
                end_date: request.end_date,
                quantity: request.quantity,
                status: BookingStatus::Requested,
                unit_price: quote.unit_price,
                total_price: quote.total_price,
                deposit_amount: quote.deposit_amount,
                actual_return_date: None,
                notes: request.notes.clone(),
                admin_notes: None,
                pickup_address: request.pickup_address.clone(),
                return_address: request.return_address.clone(),
                created_at: now,
            };
            store.index(booking.id, booking.item_id);
            list.push(booking.clone());
            Ok::<_, RentalError>(booking)
        })?;

        info!(
            booking = booking.id,
            item = booking.item_id,
            requester = booking.requester,
            quantity = booking.quantity,
            "booking requested"
        );
        Ok(booking)
    }

    /// Confirm a `Requested` booking
    ///
    /// Re-runs the availability evaluation excluding the booking's own id,
    /// since stock may have been consumed by another booking between
    /// request and payment. Evaluation and status write share the item's
    /// entry lock.
    ///
    /// # Errors
    ///
    /// `BookingNotFound`, `BookingInvalidState` if not `Requested`, or
    /// `InsufficientAvailability` if the re-check fails.
    pub fn confirm(&self, booking_id: BookingId) -> Result<Booking, RentalError> {
        let item_id = self
            .store
            .item_of(booking_id)
            .ok_or_else(|| RentalError::booking_not_found(booking_id))?;
        let item = self.availability.active_item(item_id)?;

        let booking = self.store.with_item(item_id, |list| {
            let index = list
                .iter()
                .position(|b| b.id == booking_id)
                .ok_or_else(|| RentalError::booking_not_found(booking_id))?;

            let current = list[index].status;
            let next = current
                .transition(BookingEvent::Confirm)
                .ok_or_else(|| RentalError::booking_invalid_state(booking_id, current, "confirm"))?;

            let (start, end, quantity) = {
                let b = &list[index];
                (b.start_date, b.end_date, b.quantity)
            };
            AvailabilityEngine::evaluate(&item, list, quantity, start, end, Some(booking_id))?;

            list[index].status = next;
            Ok::<_, RentalError>(list[index].clone())
        })?;

        info!(booking = booking.id, item = booking.item_id, "booking confirmed");
        Ok(booking)
    }

    /// Mark a `Confirmed` booking as `Active` (equipment handed over)
    pub fn activate(&self, booking_id: BookingId) -> Result<Booking, RentalError> {
        let booking = self.apply_event(booking_id, BookingEvent::Activate, "activate", |_| {})?;
        info!(booking = booking.id, "booking activated");
        Ok(booking)
    }

    /// Cancel a `Requested` or `Confirmed` booking
    ///
    /// The booking leaves the stock-reserving set; overlapping windows see
    /// the units again on their next availability scan.
    pub fn cancel(&self, booking_id: BookingId) -> Result<Booking, RentalError> {
        let booking = self.apply_event(booking_id, BookingEvent::Cancel, "cancel", |_| {})?;
        info!(
            booking = booking.id,
            item = booking.item_id,
            "booking cancelled, reservation released"
        );
        Ok(booking)
    }

    /// Complete a booking (equipment returned)
    ///
    /// Legal from `Active`, and also straight from `Confirmed` since
    /// operators frequently skip the explicit activation step. Records the
    /// actual return date (defaults to today).
    pub fn complete(
        &self,
        booking_id: BookingId,
        actual_return_date: Option<NaiveDate>,
    ) -> Result<Booking, RentalError> {
        let returned = actual_return_date.unwrap_or_else(|| self.clock.today());
        let booking = self.apply_event(booking_id, BookingEvent::Complete, "complete", |b| {
            b.actual_return_date = Some(returned);
        })?;
        info!(
            booking = booking.id,
            item = booking.item_id,
            "booking completed, reservation released"
        );
        Ok(booking)
    }

    /// Update a booking's mutable details
    ///
    /// Ordinary actors may edit their own booking's notes and addresses,
    /// and only while it is still `Requested`. Privileged actors may edit
    /// any non-terminal booking and may also attach admin notes.
    pub fn update_details(
        &self,
        booking_id: BookingId,
        actor: UserId,
        role: ActorRole,
        update: BookingUpdate,
    ) -> Result<Booking, RentalError> {
        let item_id = self
            .store
            .item_of(booking_id)
            .ok_or_else(|| RentalError::booking_not_found(booking_id))?;

        self.store.with_item(item_id, |list| {
            let booking = list
                .iter_mut()
                .find(|b| b.id == booking_id)
                .ok_or_else(|| RentalError::booking_not_found(booking_id))?;

            match role {
                ActorRole::Privileged => {
                    if booking.status.is_terminal() {
                        return Err(RentalError::booking_invalid_state(
                            booking_id,
                            booking.status,
                            "update",
                        ));
                    }
                }
                ActorRole::Ordinary => {
                    if booking.requester != actor {
                        return Err(RentalError::invalid_request(
                            "only the requester may update this booking",
                        ));
                    }
                    if booking.status != BookingStatus::Requested {
                        return Err(RentalError::booking_invalid_state(
                            booking_id,
                            booking.status,
                            "update",
                        ));
                    }
                    if update.admin_notes.is_some() {
                        return Err(RentalError::invalid_request(
                            "admin notes require a privileged actor",
                        ));
                    }
                }
            }

            if let Some(notes) = update.notes {
                booking.notes = Some(notes);
            }
            if let Some(pickup) = update.pickup_address {
                booking.pickup_address = Some(pickup);
            }
            if let Some(ret) = update.return_address {
                booking.return_address = Some(ret);
            }
            if let Some(admin_notes) = update.admin_notes {
                booking.admin_notes = Some(admin_notes);
            }

            debug!(booking = booking_id, "booking details updated");
            Ok(booking.clone())
        })
    }

    /// Price a window without creating anything
    ///
    /// Validates the dates and runs the availability check first, so the
    /// quote is only produced for a window that could actually be booked
    /// right now.
    pub fn pricing_preview(
        &self,
        item_id: ItemId,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Result<PricingQuote, RentalError> {
        self.validate_dates(start, end)?;
        let item = self.availability.check(item_id, quantity, start, end, None)?;
        self.pricing.price(&item, start, end, quantity)
    }

    /// Apply a lifecycle event that needs no availability re-check
    ///
    /// Looks the booking up through the id index, validates the event
    /// against the transition table under the item lock, applies it along
    /// with `mutate`, and returns the updated copy.
    fn apply_event(
        &self,
        booking_id: BookingId,
        event: BookingEvent,
        operation: &str,
        mutate: impl FnOnce(&mut Booking),
    ) -> Result<Booking, RentalError> {
        let item_id = self
            .store
            .item_of(booking_id)
            .ok_or_else(|| RentalError::booking_not_found(booking_id))?;

        self.store.with_item(item_id, |list| {
            let booking = list
                .iter_mut()
                .find(|b| b.id == booking_id)
                .ok_or_else(|| RentalError::booking_not_found(booking_id))?;

            let next = booking.status.transition(event).ok_or_else(|| {
                RentalError::booking_invalid_state(booking_id, booking.status, operation)
            })?;

            booking.status = next;
            mutate(booking);
            Ok(booking.clone())
        })
    }

    /// Validate a booking window against the clock and policy
    fn validate_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<(), RentalError> {
        let today = self.clock.today();

        if start < today {
            return Err(RentalError::invalid_request(
                "start date must not be in the past",
            ));
        }
        if end <= start {
            return Err(RentalError::invalid_request(
                "end date must be after start date",
            ));
        }

        let duration = (end - start).num_days();
        if duration < self.policy.min_duration_days {
            return Err(RentalError::invalid_request(format!(
                "rental must be at least {} day(s)",
                self.policy.min_duration_days
            )));
        }
        if duration > self.policy.max_duration_days {
            return Err(RentalError::invalid_request(format!(
                "rental must be at most {} days",
                self.policy.max_duration_days
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inmemory::{FixedClock, InMemoryCatalog};
    use crate::core::traits::Catalog;
    use crate::types::Item;
    use rstest::rstest;
    use rust_decimal::Decimal;

    const TODAY: (i32, u32, u32) = (2026, 6, 1);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn manager(total_stock: u32, policy: BookingPolicy) -> BookingManager {
        let catalog = InMemoryCatalog::new();
        catalog.insert(Item {
            id: 1,
            name: "Excavator".to_string(),
            daily_rate: Decimal::from(100),
            total_stock,
            is_active: true,
        });
        let catalog: Arc<dyn Catalog> = Arc::new(catalog);
        let store = Arc::new(BookingStore::new());
        let availability = Arc::new(AvailabilityEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
        ));
        let clock = Arc::new(FixedClock::for_date(date(TODAY.0, TODAY.1, TODAY.2)));
        BookingManager::new(store, availability, clock, policy)
    }

    fn request(quantity: u32, start: NaiveDate, end: NaiveDate) -> BookingRequest {
        BookingRequest {
            item_id: 1,
            requester: 42,
            start_date: start,
            end_date: end,
            quantity,
            notes: None,
            pickup_address: None,
            return_address: None,
        }
    }

    #[test]
    fn test_create_requested_booking_with_pricing() {
        let mgr = manager(3, BookingPolicy::default());
        let booking = mgr
            .create(request(2, date(2026, 6, 10), date(2026, 6, 17)))
            .unwrap();

        assert_eq!(booking.id, 1);
        assert_eq!(booking.status, BookingStatus::Requested);
        assert_eq!(booking.unit_price, Decimal::from(100));
        assert_eq!(booking.total_price, Decimal::from(1400));
        assert_eq!(booking.deposit_amount, Decimal::from(40));
    }

    #[rstest]
    #[case::start_in_past(date(2026, 5, 30), date(2026, 6, 5))]
    #[case::end_not_after_start(date(2026, 6, 10), date(2026, 6, 10))]
    #[case::too_long(date(2026, 6, 10), date(2026, 9, 30))]
    fn test_create_rejects_bad_dates(#[case] start: NaiveDate, #[case] end: NaiveDate) {
        let mgr = manager(3, BookingPolicy::default());
        let result = mgr.create(request(1, start, end));
        assert!(matches!(result, Err(RentalError::InvalidRequest { .. })));
    }

    #[test]
    fn test_create_enforces_quota() {
        let policy = BookingPolicy {
            max_held_per_requester: 2,
            ..BookingPolicy::default()
        };
        let mgr = manager(10, policy);

        mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 12))).unwrap();
        mgr.create(request(1, date(2026, 7, 1), date(2026, 7, 3))).unwrap();

        let err = mgr
            .create(request(1, date(2026, 8, 1), date(2026, 8, 3)))
            .unwrap_err();
        assert_eq!(err, RentalError::quota_exceeded(42, 2, 2));
    }

    #[test]
    fn test_cancelled_bookings_do_not_count_toward_quota() {
        let policy = BookingPolicy {
            max_held_per_requester: 1,
            ..BookingPolicy::default()
        };
        let mgr = manager(10, policy);

        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 12))).unwrap();
        mgr.cancel(b.id).unwrap();

        assert!(mgr.create(request(1, date(2026, 7, 1), date(2026, 7, 3))).is_ok());
    }

    #[test]
    fn test_confirm_moves_to_confirmed() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();

        let confirmed = mgr.confirm(b.id).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        // Second confirm is an invalid state, not a double decrement
        let err = mgr.confirm(b.id).unwrap_err();
        assert!(matches!(err, RentalError::BookingInvalidState { .. }));
    }

    #[test]
    fn test_confirm_recheck_does_not_count_self() {
        // totalStock = 1 and the booking occupies the whole window; the
        // re-check must exclude the booking's own reservation.
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();
        assert!(mgr.confirm(b.id).is_ok());
    }

    #[test]
    fn test_confirm_fails_when_stock_was_taken() {
        let mgr = manager(1, BookingPolicy::default());
        let first = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();

        // A second requested booking for a disjoint sub-window cannot
        // exist (create would have failed), so simulate contention with an
        // overlapping window booked after cancellation of the first hold.
        mgr.cancel(first.id).unwrap();
        let rival = mgr.create(request(1, date(2026, 6, 12), date(2026, 6, 20))).unwrap();
        mgr.confirm(rival.id).unwrap();

        // Recreate an overlapping request: blocked already at create time.
        let err = mgr
            .create(request(1, date(2026, 6, 10), date(2026, 6, 17)))
            .unwrap_err();
        assert_eq!(err, RentalError::insufficient_availability(1, 1, 0));
    }

    #[test]
    fn test_capacity_error_when_request_exceeds_total_stock() {
        let mgr = manager(3, BookingPolicy::default());
        let err = mgr
            .create(request(5, date(2026, 6, 10), date(2026, 6, 12)))
            .unwrap_err();
        assert_eq!(err, RentalError::capacity_exceeded(1, 5, 3));
    }

    #[test]
    fn test_stock_round_trip_create_confirm_cancel() {
        let mgr = manager(3, BookingPolicy::default());
        let window = (date(2026, 6, 10), date(2026, 6, 17));

        let before = mgr
            .availability
            .available_units(1, window.0, window.1)
            .unwrap();
        assert_eq!(before, 3);

        let b = mgr.create(request(2, window.0, window.1)).unwrap();
        mgr.confirm(b.id).unwrap();
        assert_eq!(
            mgr.availability.available_units(1, window.0, window.1).unwrap(),
            1
        );

        mgr.cancel(b.id).unwrap();
        assert_eq!(
            mgr.availability.available_units(1, window.0, window.1).unwrap(),
            before
        );
    }

    #[test]
    fn test_complete_from_confirmed_records_return_date() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();
        mgr.confirm(b.id).unwrap();

        let completed = mgr.complete(b.id, Some(date(2026, 6, 16))).unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert_eq!(completed.actual_return_date, Some(date(2026, 6, 16)));
    }

    #[test]
    fn test_activate_then_complete_defaults_return_to_today() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();
        mgr.confirm(b.id).unwrap();
        mgr.activate(b.id).unwrap();

        let completed = mgr.complete(b.id, None).unwrap();
        assert_eq!(completed.actual_return_date, Some(date(TODAY.0, TODAY.1, TODAY.2)));
    }

    #[test]
    fn test_cancel_active_is_rejected() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();
        mgr.confirm(b.id).unwrap();
        mgr.activate(b.id).unwrap();

        assert!(matches!(
            mgr.cancel(b.id).unwrap_err(),
            RentalError::BookingInvalidState { .. }
        ));
    }

    #[test]
    fn test_update_details_requester_only_while_requested() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();

        // Someone else's ordinary update is rejected
        let err = mgr
            .update_details(
                b.id,
                7,
                ActorRole::Ordinary,
                BookingUpdate {
                    notes: Some("mine now".to_string()),
                    ..BookingUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RentalError::InvalidRequest { .. }));

        // The requester may update while requested
        let updated = mgr
            .update_details(
                b.id,
                42,
                ActorRole::Ordinary,
                BookingUpdate {
                    notes: Some("deliver early".to_string()),
                    pickup_address: Some("Yard 3".to_string()),
                    ..BookingUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("deliver early"));

        // After confirmation the ordinary path closes, privileged stays open
        mgr.confirm(b.id).unwrap();
        assert!(mgr
            .update_details(
                b.id,
                42,
                ActorRole::Ordinary,
                BookingUpdate {
                    notes: Some("too late".to_string()),
                    ..BookingUpdate::default()
                },
            )
            .is_err());
        let updated = mgr
            .update_details(
                b.id,
                1,
                ActorRole::Privileged,
                BookingUpdate {
                    admin_notes: Some("customer called".to_string()),
                    ..BookingUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.admin_notes.as_deref(), Some("customer called"));
    }

    #[test]
    fn test_pricing_preview_checks_availability_first() {
        let mgr = manager(1, BookingPolicy::default());
        let b = mgr.create(request(1, date(2026, 6, 10), date(2026, 6, 17))).unwrap();
        mgr.confirm(b.id).unwrap();

        let err = mgr
            .pricing_preview(1, date(2026, 6, 12), date(2026, 6, 14), 1)
            .unwrap_err();
        assert!(matches!(err, RentalError::InsufficientAvailability { .. }));

        let quote = mgr
            .pricing_preview(1, date(2026, 6, 17), date(2026, 6, 20), 1)
            .unwrap();
        assert_eq!(quote.total_price, Decimal::from(300));
    }
}
