//! Concurrent booking storage
//!
//! Bookings are stored per item in a `DashMap<ItemId, Vec<Booking>>`. The
//! map's entry guard doubles as the per-item lock required by the
//! availability contract: [`BookingStore::with_item`] runs a closure while
//! holding the guard, so an availability evaluation and the write it gates
//! form one atomic unit. Two racing requests on the same item serialize on
//! the guard; the loser re-reads the updated booking list and fails its
//! re-check.
//!
//! A secondary `BookingId -> ItemId` index routes id-based operations to
//! the owning item entry. The index is insert-once and never mutated
//! afterwards, so it cannot disagree with the item map.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::types::{Booking, BookingId, ItemId, UserId};

/// Concurrent, per-item booking storage
#[derive(Debug, Default)]
pub struct BookingStore {
    /// Bookings grouped by item; the entry guard is the per-item lock
    by_item: DashMap<ItemId, Vec<Booking>>,
    /// Routes a booking id to its owning item
    item_of: DashMap<BookingId, ItemId>,
    /// Monotonic id source
    next_id: AtomicU64,
}

impl BookingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next booking id
    pub fn next_id(&self) -> BookingId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run a closure against an item's booking list while holding its
    /// entry lock
    ///
    /// This is the per-item critical section: everything the closure does
    /// (occupancy scan, status write, insert) is isolated from concurrent
    /// mutations of the same item. The closure must not touch the store
    /// again, or it would deadlock on its own shard.
    pub fn with_item<T>(&self, item: ItemId, f: impl FnOnce(&mut Vec<Booking>) -> T) -> T {
        let mut entry = self.by_item.entry(item).or_default();
        f(entry.value_mut())
    }

    /// Record a freshly created booking in the id index
    ///
    /// Called inside the creating `with_item` closure's critical section
    /// (the index is a separate map, so this does not re-enter the item
    /// map).
    pub fn index(&self, booking: BookingId, item: ItemId) {
        self.item_of.insert(booking, item);
    }

    /// The item a booking belongs to
    pub fn item_of(&self, booking: BookingId) -> Option<ItemId> {
        self.item_of.get(&booking).map(|entry| *entry)
    }

    /// Fetch a booking by id (snapshot copy)
    pub fn get(&self, booking: BookingId) -> Option<Booking> {
        let item = self.item_of(booking)?;
        self.by_item
            .get(&item)
            .and_then(|list| list.iter().find(|b| b.id == booking).cloned())
    }

    /// Count the requester's bookings that currently reserve stock
    ///
    /// Scans all items; used for the per-requester quota. Runs without any
    /// entry guard held, so the count is a momentary snapshot.
    pub fn count_reserving_for(&self, requester: UserId) -> usize {
        self.by_item
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|b| b.requester == requester && b.status.reserves_stock())
                    .count()
            })
            .sum()
    }

    /// All bookings, sorted by id for deterministic output
    pub fn snapshot(&self) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .by_item
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by_key(|b| b.id);
        bookings
    }
}
