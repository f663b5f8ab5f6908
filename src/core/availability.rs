//! Availability computation
//!
//! This module answers one question: can `quantity` units of an item be
//! reserved over `[start, end)` given every other booking that reserves
//! stock in an overlapping window? Availability is always *computed* from
//! the current booking set; no cached free-stock counter exists anywhere,
//! so there is nothing to drift.
//!
//! The pure evaluation ([`AvailabilityEngine::evaluate`]) is separated
//! from the locking query ([`AvailabilityEngine::check`]) so the booking
//! lifecycle can run the same evaluation *inside* the item's entry lock,
//! making the check-then-write sequence atomic per item.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::core::booking_store::BookingStore;
use crate::core::traits::Catalog;
use crate::types::{Booking, BookingId, Item, ItemId, RentalError};

/// Computes free stock for an item over a date window
pub struct AvailabilityEngine {
    catalog: Arc<dyn Catalog>,
    bookings: Arc<BookingStore>,
}

impl AvailabilityEngine {
    /// Create an engine over the given catalog and booking set
    pub fn new(catalog: Arc<dyn Catalog>, bookings: Arc<BookingStore>) -> Self {
        Self { catalog, bookings }
    }

    /// Fetch an active item or fail with `ItemNotFound`
    ///
    /// Retired items are indistinguishable from absent ones.
    pub fn active_item(&self, item_id: ItemId) -> Result<Item, RentalError> {
        self.catalog
            .get_item(item_id)
            .filter(|item| item.is_active)
            .ok_or_else(|| RentalError::item_not_found(item_id))
    }

    /// Check whether `quantity` units are free over `[start, end)`
    ///
    /// Takes the item's entry lock for the duration of the scan, so the
    /// answer is consistent with the booking set at one instant. Pass
    /// `exclude` when re-validating a booking that must not count against
    /// itself (the confirm re-check).
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the item is absent or retired
    /// - `CapacityExceeded` if `quantity` exceeds total stock outright
    /// - `InsufficientAvailability` (carrying the free count) if other
    ///   bookings occupy too much of the window
    pub fn check(
        &self,
        item_id: ItemId,
        quantity: u32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<BookingId>,
    ) -> Result<Item, RentalError> {
        let item = self.active_item(item_id)?;
        self.bookings.with_item(item_id, |list| {
            Self::evaluate(&item, list, quantity, start, end, exclude)
        })?;
        Ok(item)
    }

    /// Units free over `[start, end)` right now
    ///
    /// Query form of [`check`](Self::check) for display purposes.
    pub fn available_units(
        &self,
        item_id: ItemId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, RentalError> {
        let item = self.active_item(item_id)?;
        let occupied = self
            .bookings
            .with_item(item_id, |list| Self::occupied_quantity(list, start, end, None));
        Ok(item.total_stock.saturating_sub(occupied))
    }

    /// Pure availability evaluation against a booking slate
    ///
    /// Called by [`check`](Self::check) and, crucially, by the booking
    /// lifecycle from inside the item's entry lock. Must stay free of any
    /// store access.
    pub fn evaluate(
        item: &Item,
        bookings: &[Booking],
        quantity: u32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<BookingId>,
    ) -> Result<(), RentalError> {
        // A request larger than total stock can never be satisfied,
        // regardless of timing.
        if quantity > item.total_stock {
            return Err(RentalError::capacity_exceeded(
                item.id,
                quantity,
                item.total_stock,
            ));
        }

        let occupied = Self::occupied_quantity(bookings, start, end, exclude);
        let available = item.total_stock.saturating_sub(occupied);

        if quantity > available {
            return Err(RentalError::insufficient_availability(
                item.id, quantity, available,
            ));
        }

        Ok(())
    }

    /// Sum of quantities reserved by stock-holding bookings overlapping
    /// `[start, end)`
    pub fn occupied_quantity(
        bookings: &[Booking],
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<BookingId>,
    ) -> u32 {
        bookings
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| b.status.reserves_stock())
            .filter(|b| b.overlaps(start, end))
            .map(|b| b.quantity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inmemory::InMemoryCatalog;
    use crate::types::BookingStatus;
    use chrono::{DateTime, Utc};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(total_stock: u32) -> Item {
        Item {
            id: 1,
            name: "Concrete mixer".to_string(),
            daily_rate: Decimal::new(10000, 2),
            total_stock,
            is_active: true,
        }
    }

    fn booking(
        id: BookingId,
        status: BookingStatus,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Booking {
        Booking {
            id,
            item_id: 1,
            requester: 1,
            start_date: start,
            end_date: end,
            quantity,
            status,
            unit_price: Decimal::new(10000, 2),
            total_price: Decimal::ZERO,
            deposit_amount: Decimal::ZERO,
            actual_return_date: None,
            notes: None,
            admin_notes: None,
            pickup_address: None,
            return_address: None,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn engine_with(items: Vec<Item>, bookings: Vec<Booking>) -> AvailabilityEngine {
        let catalog = InMemoryCatalog::new();
        for i in items {
            catalog.insert(i);
        }
        let store = BookingStore::new();
        for b in bookings {
            let id = b.id;
            let item_id = b.item_id;
            store.with_item(item_id, |list| list.push(b));
            store.index(id, item_id);
        }
        AvailabilityEngine::new(Arc::new(catalog), Arc::new(store))
    }

    #[test]
    fn test_capacity_exceeded_beats_window_math() {
        let engine = engine_with(vec![item(4)], vec![]);
        let err = engine
            .check(1, 9, date(2026, 6, 1), date(2026, 6, 8), None)
            .unwrap_err();
        assert_eq!(err, RentalError::capacity_exceeded(1, 9, 4));
    }

    // totalStock = 1, one confirmed booking for [June 1, June 8)
    #[rstest]
    #[case::overlapping_rejected(date(2026, 6, 5), date(2026, 6, 10), false)]
    #[case::back_to_back_accepted(date(2026, 6, 8), date(2026, 6, 10), true)]
    #[case::before_accepted(date(2026, 5, 20), date(2026, 6, 1), true)]
    fn test_half_open_boundary(
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] ok: bool,
    ) {
        let engine = engine_with(
            vec![item(1)],
            vec![booking(
                1,
                BookingStatus::Confirmed,
                date(2026, 6, 1),
                date(2026, 6, 8),
                1,
            )],
        );
        let result = engine.check(1, 1, start, end, None);
        if ok {
            assert!(result.is_ok());
        } else {
            assert_eq!(
                result.unwrap_err(),
                RentalError::insufficient_availability(1, 1, 0)
            );
        }
    }

    #[test]
    fn test_pending_holds_also_reserve() {
        let engine = engine_with(
            vec![item(2)],
            vec![
                booking(1, BookingStatus::Requested, date(2026, 6, 1), date(2026, 6, 8), 1),
                booking(2, BookingStatus::Active, date(2026, 6, 3), date(2026, 6, 6), 1),
            ],
        );
        let err = engine
            .check(1, 1, date(2026, 6, 4), date(2026, 6, 5), None)
            .unwrap_err();
        assert_eq!(err, RentalError::insufficient_availability(1, 1, 0));
    }

    #[test]
    fn test_terminal_bookings_release_stock() {
        let engine = engine_with(
            vec![item(1)],
            vec![
                booking(1, BookingStatus::Cancelled, date(2026, 6, 1), date(2026, 6, 8), 1),
                booking(2, BookingStatus::Completed, date(2026, 6, 1), date(2026, 6, 8), 1),
            ],
        );
        assert!(engine
            .check(1, 1, date(2026, 6, 2), date(2026, 6, 5), None)
            .is_ok());
    }

    #[test]
    fn test_exclude_skips_own_reservation() {
        let engine = engine_with(
            vec![item(1)],
            vec![booking(
                1,
                BookingStatus::Requested,
                date(2026, 6, 1),
                date(2026, 6, 8),
                1,
            )],
        );

        // Without exclusion the booking blocks its own window
        assert!(engine
            .check(1, 1, date(2026, 6, 1), date(2026, 6, 8), None)
            .is_err());
        // The confirm re-check excludes the booking's own id
        assert!(engine
            .check(1, 1, date(2026, 6, 1), date(2026, 6, 8), Some(1))
            .is_ok());
    }

    #[test]
    fn test_available_units_sums_overlaps() {
        let engine = engine_with(
            vec![item(5)],
            vec![
                booking(1, BookingStatus::Confirmed, date(2026, 6, 1), date(2026, 6, 8), 2),
                booking(2, BookingStatus::Requested, date(2026, 6, 5), date(2026, 6, 12), 1),
                booking(3, BookingStatus::Confirmed, date(2026, 7, 1), date(2026, 7, 8), 2),
            ],
        );
        assert_eq!(
            engine
                .available_units(1, date(2026, 6, 6), date(2026, 6, 7))
                .unwrap(),
            2
        );
        assert_eq!(
            engine
                .available_units(1, date(2026, 6, 20), date(2026, 6, 25))
                .unwrap(),
            5
        );
    }

    #[test]
    fn test_retired_item_is_invisible() {
        let mut retired = item(3);
        retired.is_active = false;
        let engine = engine_with(vec![retired], vec![]);
        assert_eq!(
            engine
                .check(1, 1, date(2026, 6, 1), date(2026, 6, 2), None)
                .unwrap_err(),
            RentalError::item_not_found(1)
        );
    }
}
