//! Rental pricing
//!
//! Pure daily-rate pricing with a separately tracked security deposit.
//! The deposit is deliberately *not* folded into the total: it is a
//! refundable amount with its own settlement path, so `total_price`
//! covers the rental alone.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::types::{Item, RentalError};

/// A priced rental quote
#[derive(Debug, Clone, PartialEq)]
pub struct PricingQuote {
    /// Price per day per unit (the item's daily rate)
    pub unit_price: Decimal,

    /// Number of billed days (at least 1)
    pub duration_days: i64,

    /// Units priced
    pub quantity: u32,

    /// `unit_price * duration_days * quantity`
    pub subtotal: Decimal,

    /// Refundable security deposit: `unit_price * deposit_rate * quantity`
    pub deposit_amount: Decimal,

    /// Amount actually billed for the rental; equals `subtotal`
    pub total_price: Decimal,
}

/// Computes rental quotes
///
/// Stateless apart from the deposit rate; no side effects, and the only
/// failure mode is a malformed request (non-positive duration/quantity).
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    deposit_rate: Decimal,
}

impl PricingCalculator {
    /// Deposit rate applied per unit: 20% of the daily rate
    pub const DEFAULT_DEPOSIT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

    /// Create a calculator with the default deposit rate
    pub fn new() -> Self {
        Self {
            deposit_rate: Self::DEFAULT_DEPOSIT_RATE,
        }
    }

    /// Create a calculator with a custom deposit rate
    pub fn with_deposit_rate(deposit_rate: Decimal) -> Self {
        Self { deposit_rate }
    }

    /// Price `quantity` units of `item` over `[start, end)`
    ///
    /// `duration_days = max(1, end - start)`; same-day windows are
    /// rejected rather than rounded up, since `end` is an exclusive bound
    /// and a zero-length window books nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a non-positive duration or a zero
    /// quantity.
    pub fn price(
        &self,
        item: &Item,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Result<PricingQuote, RentalError> {
        if quantity == 0 {
            return Err(RentalError::invalid_request("quantity must be positive"));
        }

        let days = (end - start).num_days();
        if days <= 0 {
            return Err(RentalError::invalid_request(
                "end date must be after start date",
            ));
        }
        let duration_days = days.max(1);

        let unit_price = item.daily_rate;
        let subtotal = unit_price * Decimal::from(duration_days) * Decimal::from(quantity);
        let deposit_amount = unit_price * self.deposit_rate * Decimal::from(quantity);

        Ok(PricingQuote {
            unit_price,
            duration_days,
            quantity,
            subtotal,
            deposit_amount,
            total_price: subtotal,
        })
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new()
    }
}
