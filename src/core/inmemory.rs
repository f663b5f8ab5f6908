//! In-memory collaborator implementations
//!
//! These back the CLI pipeline and the test suite: a dashmap-based
//! catalog, a scriptable fake gateway, and system/fixed clocks. Real
//! deployments replace them behind the traits in [`crate::core::traits`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::core::traits::{Catalog, Clock, GatewayIntent, IntentMetadata, PaymentGateway};
use crate::types::{GatewayPaymentStatus, Item, ItemId, RentalError};

/// Catalog backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: DashMap<ItemId, Item>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item
    pub fn insert(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    /// Number of items loaded
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn get_item(&self, id: ItemId) -> Option<Item> {
        self.items.get(&id).map(|entry| entry.clone())
    }
}

/// Scriptable fake payment gateway
///
/// Issues deterministic intent references (`pi_1`, `pi_2`, ...) and
/// reports whatever status was scripted for each reference; fresh intents
/// start as `requires_confirmation`. Refunds succeed unless
/// [`ScriptedGateway::fail_refunds`] was called, which makes the refund
/// path exercise the local-cancellation fallback.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    counter: AtomicU64,
    statuses: DashMap<String, GatewayPaymentStatus>,
    refunds_fail: AtomicBool,
}

impl ScriptedGateway {
    /// Create a gateway with no scripted statuses
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status the gateway will report for a reference
    pub fn set_status(&self, external_ref: &str, status: GatewayPaymentStatus) {
        self.statuses.insert(external_ref.to_string(), status);
    }

    /// Make subsequent refund calls fail
    pub fn fail_refunds(&self, fail: bool) {
        self.refunds_fail.store(fail, Ordering::SeqCst);
    }
}

impl PaymentGateway for ScriptedGateway {
    fn create_intent(
        &self,
        _amount: Decimal,
        _currency: &str,
        _metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, RentalError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let external_ref = format!("pi_{}", n);
        self.statuses
            .insert(external_ref.clone(), GatewayPaymentStatus::RequiresConfirmation);

        Ok(GatewayIntent {
            client_handle: format!("{}_secret", external_ref),
            external_ref,
        })
    }

    fn retrieve_status(&self, external_ref: &str) -> Result<GatewayPaymentStatus, RentalError> {
        self.statuses
            .get(external_ref)
            .map(|entry| *entry)
            .ok_or_else(|| {
                RentalError::gateway_error(format!("no such intent: {}", external_ref))
            })
    }

    fn refund(&self, external_ref: &str) -> Result<(), RentalError> {
        if self.refunds_fail.load(Ordering::SeqCst) {
            return Err(RentalError::gateway_error(format!(
                "refund declined for {}",
                external_ref
            )));
        }
        self.statuses
            .insert(external_ref.to_string(), GatewayPaymentStatus::Canceled);
        Ok(())
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant, for tests and reproducible CLI runs
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    /// Pin the clock to noon UTC on the given day
    pub fn for_date(today: NaiveDate) -> Self {
        let now = today
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
