//! Item types for the rental engine
//!
//! This module defines the inventory item snapshot handed out by the
//! catalog collaborator. The engine never mutates catalog fields; stock
//! availability is always derived from the current booking set.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Item identifier
///
/// Supports item IDs from 0 to 4,294,967,295
pub type ItemId = u32;

/// Inventory item snapshot
///
/// Represents one rentable equipment type as reported by the catalog
/// collaborator. `total_stock` is the physical unit count and is immutable
/// from the engine's point of view; the number of *free* units for a date
/// window is computed against the booking set, never cached here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The item ID
    pub id: ItemId,

    /// Human-readable item name (display only)
    pub name: String,

    /// Rental price per day per unit
    pub daily_rate: Decimal,

    /// Physical units that exist in total
    ///
    /// Owned by catalog management. The sum of quantities of overlapping
    /// stock-reserving bookings may never exceed this value.
    pub total_stock: u32,

    /// Whether the item is rentable at all
    ///
    /// Retired items are invisible to the engine: lookups treat them the
    /// same as an absent item.
    pub is_active: bool,
}
