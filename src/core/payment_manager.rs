//! Payment lifecycle management
//!
//! Drives gateway intents, status synchronization, the manual
//! offline-approval path, and administrative cancellation with refund
//! fallback. All status changes go through the transition table in
//! [`PaymentStatus::transition`] under the payment's entry lock; the
//! store's clone-validate-commit update means a rejected transition
//! leaves the record untouched.
//!
//! This module never touches bookings. Success and cancellation outcomes
//! are reported to the caller (the engine facade), which hands them to
//! the reconciliation coordinator.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::payment_store::PaymentStore;
use crate::core::traits::{Clock, IntentMetadata, PaymentGateway};
use crate::types::{
    BookingId, PaymentEvent, PaymentId, PaymentKind, PaymentMethod, PaymentRecord, PaymentStatus,
    RentalError, UserId,
};

/// A freshly created gateway intent, with the handle the payer's client
/// needs to confirm it
#[derive(Debug, Clone)]
pub struct IntentReceipt {
    /// The persisted payment record
    pub payment: PaymentRecord,
    /// Client-confirmable secret from the gateway
    pub client_handle: String,
}

/// Result of pulling an intent's status from the gateway
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The payment after synchronization
    pub payment: PaymentRecord,
    /// Whether this sync moved the payment into `Completed`
    ///
    /// Drives reconciliation exactly once per payment: a repeated sync of
    /// an already-completed intent reports `false`.
    pub newly_completed: bool,
}

/// What happened to the gateway-side money during an admin cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundDisposition {
    /// The gateway refunded the completed payment
    Refunded,
    /// Nothing to refund (payment was not a completed gateway payment)
    NotAttempted,
    /// The refund call failed; the payment was cancelled locally and the
    /// discrepancy recorded for manual follow-up
    FallbackCancelled {
        /// The gateway error that forced the fallback
        reason: String,
    },
}

/// Result of an administrative payment cancellation
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// The payment after cancellation
    pub payment: PaymentRecord,
    /// What happened to the gateway-side money
    pub refund: RefundDisposition,
}

/// Drives the payment state machine
pub struct PaymentManager {
    store: Arc<PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl PaymentManager {
    /// Create a manager over the given store and collaborators
    pub fn new(
        store: Arc<PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
        }
    }

    /// Fetch a payment by id
    pub fn get(&self, payment: PaymentId) -> Result<PaymentRecord, RentalError> {
        self.store
            .get(payment)
            .ok_or_else(|| RentalError::payment_not_found(payment))
    }

    /// Create a gateway payment intent
    ///
    /// Supersedes any live (pending/processing) attempt for the same
    /// booking first, so at most one attempt can ever settle. The record
    /// is persisted as `Pending` with the gateway's reference indexed for
    /// later synchronization.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for a non-positive amount, or `GatewayError` if the
    /// gateway rejects the intent (nothing is persisted in that case).
    pub fn create_gateway_intent(
        &self,
        payer: UserId,
        booking_id: Option<BookingId>,
        amount: Decimal,
        currency: &str,
        kind: PaymentKind,
        description: Option<String>,
    ) -> Result<IntentReceipt, RentalError> {
        if amount <= Decimal::ZERO {
            return Err(RentalError::invalid_amount(amount));
        }

        if let Some(booking) = booking_id {
            for stale in self.store.live_attempts_for(booking) {
                let superseded = self.store.update(stale, |p| {
                    // Live attempts always admit Cancel; the table check is
                    // belt-and-braces against racing syncs.
                    let next = p.status.transition(PaymentEvent::Cancel).ok_or_else(|| {
                        RentalError::payment_invalid_state(p.id, p.status, "supersede")
                    })?;
                    p.status = next;
                    p.failure_reason = Some("superseded by a newer payment attempt".to_string());
                    Ok(())
                });
                match superseded {
                    Ok(_) => info!(payment = stale, booking, "superseded stale attempt"),
                    Err(err) => warn!(payment = stale, %err, "could not supersede attempt"),
                }
            }
        }

        let metadata = IntentMetadata { booking_id, payer };
        let intent = self.gateway.create_intent(amount, currency, &metadata)?;

        let payment = PaymentRecord {
            id: self.store.next_id(),
            booking_id,
            payer,
            amount,
            currency: currency.to_string(),
            kind,
            method: PaymentMethod::Gateway,
            status: PaymentStatus::Pending,
            external_ref: Some(intent.external_ref),
            external_status: None,
            description,
            failure_reason: None,
            approved_by: None,
            approved_at: None,
            approval_notes: None,
            processed_at: None,
            created_at: self.clock.now(),
        };
        self.store.insert(payment.clone());

        info!(
            payment = payment.id,
            booking = booking_id,
            %amount,
            "gateway intent created"
        );
        Ok(IntentReceipt {
            payment,
            client_handle: intent.client_handle,
        })
    }

    /// Pull an intent's current status from the gateway and apply it
    ///
    /// The gateway's answer is mapped through the fixed vocabulary table
    /// and applied idempotently: a repeated report of the current status is
    /// a no-op, and a payment already settled locally (offline approval,
    /// refund) is never overwritten by gateway state.
    ///
    /// # Errors
    ///
    /// `UnknownExternalReference` if no payment carries the reference, or
    /// `GatewayError` if the gateway lookup itself fails.
    pub fn sync_from_gateway(&self, external_ref: &str) -> Result<SyncOutcome, RentalError> {
        let payment_id = self
            .store
            .find_by_external_ref(external_ref)
            .ok_or_else(|| RentalError::unknown_external_reference(external_ref))?;

        let gateway_status = self.gateway.retrieve_status(external_ref)?;
        let mapped = gateway_status.to_local();
        let now = self.clock.now();

        let mut newly_completed = false;
        let payment = self.store.update(payment_id, |p| {
            p.external_status = Some(gateway_status.as_str().to_string());

            // Locally settled payments outrank gateway state.
            if matches!(
                p.status,
                PaymentStatus::ApprovedOffline | PaymentStatus::Refunded
            ) {
                warn!(
                    payment = p.id,
                    status = %p.status,
                    gateway = gateway_status.as_str(),
                    "ignoring gateway status for locally settled payment"
                );
                return Ok(());
            }

            if mapped == p.status {
                return Ok(());
            }

            let event = match mapped {
                PaymentStatus::Completed => PaymentEvent::Succeed,
                PaymentStatus::Processing => PaymentEvent::BeginProcessing,
                PaymentStatus::Failed => PaymentEvent::Fail,
                PaymentStatus::Cancelled => PaymentEvent::Cancel,
                // Pending is the starting state; the gateway reporting
                // "still pending" never moves anything.
                _ => return Ok(()),
            };

            let Some(next) = p.status.transition(event) else {
                warn!(
                    payment = p.id,
                    status = %p.status,
                    gateway = gateway_status.as_str(),
                    "gateway status not applicable in current state"
                );
                return Ok(());
            };

            p.status = next;
            match next {
                PaymentStatus::Completed => {
                    p.processed_at = Some(now);
                    newly_completed = true;
                }
                PaymentStatus::Failed => {
                    p.failure_reason =
                        Some(format!("gateway reported {}", gateway_status.as_str()));
                }
                _ => {}
            }
            Ok(())
        })?;

        if newly_completed {
            info!(payment = payment.id, "payment completed by gateway");
        }
        Ok(SyncOutcome {
            payment,
            newly_completed,
        })
    }

    /// Approve a payment manually (cash or bank transfer settlement)
    ///
    /// Legal from `Pending`, `Processing`, `Failed`, and `Cancelled`.
    /// Records the approver, the approval instant, and optional notes.
    ///
    /// # Errors
    ///
    /// `AlreadyApproved` if the payment has already settled successfully
    /// (either path), `PaymentInvalidState` if it is refunded.
    pub fn approve_offline(
        &self,
        payment_id: PaymentId,
        approver: UserId,
        notes: Option<String>,
    ) -> Result<PaymentRecord, RentalError> {
        let now = self.clock.now();
        let payment = self.store.update(payment_id, |p| {
            if p.status.is_successful() {
                return Err(RentalError::already_approved(p.id));
            }
            let next = p
                .status
                .transition(PaymentEvent::ApproveOffline)
                .ok_or_else(|| {
                    RentalError::payment_invalid_state(p.id, p.status, "approve_offline")
                })?;
            p.status = next;
            p.approved_by = Some(approver);
            p.approved_at = Some(now);
            p.approval_notes = notes.clone();
            p.processed_at = Some(now);
            // A failed gateway attempt that is later settled in cash is no
            // longer failed.
            p.failure_reason = None;
            Ok(())
        })?;

        info!(payment = payment.id, approver, "payment approved offline");
        Ok(payment)
    }

    /// Record a payment that was settled outside the gateway entirely
    ///
    /// The record is born `ApprovedOffline`; there is no gateway reference
    /// and nothing to synchronize.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for a non-positive amount.
    pub fn record_offline_payment(
        &self,
        payer: UserId,
        booking_id: Option<BookingId>,
        amount: Decimal,
        currency: &str,
        kind: PaymentKind,
        method: PaymentMethod,
        approver: UserId,
        notes: Option<String>,
    ) -> Result<PaymentRecord, RentalError> {
        if amount <= Decimal::ZERO {
            return Err(RentalError::invalid_amount(amount));
        }

        let now = self.clock.now();
        let payment = PaymentRecord {
            id: self.store.next_id(),
            booking_id,
            payer,
            amount,
            currency: currency.to_string(),
            kind,
            method,
            status: PaymentStatus::ApprovedOffline,
            external_ref: None,
            external_status: None,
            description: None,
            failure_reason: None,
            approved_by: Some(approver),
            approved_at: Some(now),
            approval_notes: notes,
            processed_at: Some(now),
            created_at: now,
        };
        self.store.insert(payment.clone());

        info!(
            payment = payment.id,
            booking = booking_id,
            approver,
            "offline payment recorded"
        );
        Ok(payment)
    }

    /// Administratively cancel a payment
    ///
    /// For a completed gateway payment this first attempts a refund. On
    /// refund success the payment becomes `Refunded`; if the gateway call
    /// fails the payment is cancelled locally anyway, with the gateway
    /// error preserved as the failure reason for manual follow-up. Every
    /// other cancellable state goes straight to `Cancelled`.
    ///
    /// # Errors
    ///
    /// `PaymentNotFound`, or `PaymentInvalidState` for states the table
    /// does not admit cancellation from (`Failed`, `Refunded`).
    pub fn cancel_by_admin(
        &self,
        payment_id: PaymentId,
        approver: UserId,
    ) -> Result<CancelOutcome, RentalError> {
        let current = self.get(payment_id)?;

        // Validate up front so a doomed cancellation never reaches the
        // gateway.
        if current.status.transition(PaymentEvent::Cancel).is_none() {
            return Err(RentalError::payment_invalid_state(
                payment_id,
                current.status,
                "cancel",
            ));
        }

        let refund = if current.status == PaymentStatus::Completed
            && current.method == PaymentMethod::Gateway
        {
            match current.external_ref.as_deref() {
                Some(external_ref) => match self.gateway.refund(external_ref) {
                    Ok(()) => RefundDisposition::Refunded,
                    Err(err) => {
                        warn!(
                            payment = payment_id,
                            %err,
                            "refund failed, cancelling locally"
                        );
                        RefundDisposition::FallbackCancelled {
                            reason: err.to_string(),
                        }
                    }
                },
                None => RefundDisposition::NotAttempted,
            }
        } else {
            RefundDisposition::NotAttempted
        };

        let refunded = refund == RefundDisposition::Refunded;
        let fallback_reason = match &refund {
            RefundDisposition::FallbackCancelled { reason } => Some(reason.clone()),
            _ => None,
        };

        let payment = self.store.update(payment_id, |p| {
            let event = if refunded {
                PaymentEvent::Refund
            } else {
                PaymentEvent::Cancel
            };
            let next = p
                .status
                .transition(event)
                .ok_or_else(|| RentalError::payment_invalid_state(p.id, p.status, "cancel"))?;
            p.status = next;
            if let Some(reason) = fallback_reason.clone() {
                p.failure_reason = Some(reason);
            }
            Ok(())
        })?;

        info!(
            payment = payment.id,
            approver,
            status = %payment.status,
            "payment cancelled by admin"
        );
        Ok(CancelOutcome { payment, refund })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inmemory::{FixedClock, ScriptedGateway};
    use crate::types::GatewayPaymentStatus;
    use chrono::NaiveDate;

    fn setup() -> (PaymentManager, Arc<ScriptedGateway>) {
        let store = Arc::new(PaymentStore::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let clock = Arc::new(FixedClock::for_date(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        ));
        let manager = PaymentManager::new(store, Arc::clone(&gateway) as Arc<dyn PaymentGateway>, clock);
        (manager, gateway)
    }

    fn intent(manager: &PaymentManager, booking: Option<BookingId>) -> IntentReceipt {
        manager
            .create_gateway_intent(
                7,
                booking,
                Decimal::new(50000, 2),
                "PLN",
                PaymentKind::Rental,
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_intent_creation_persists_pending_record() {
        let (manager, _) = setup();
        let receipt = intent(&manager, Some(10));

        assert_eq!(receipt.payment.status, PaymentStatus::Pending);
        assert_eq!(receipt.payment.external_ref.as_deref(), Some("pi_1"));
        assert_eq!(receipt.client_handle, "pi_1_secret");
        assert_eq!(manager.get(receipt.payment.id).unwrap().booking_id, Some(10));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let (manager, _) = setup();
        let err = manager
            .create_gateway_intent(7, None, Decimal::ZERO, "PLN", PaymentKind::Rental, None)
            .unwrap_err();
        assert_eq!(err, RentalError::invalid_amount(Decimal::ZERO));
    }

    #[test]
    fn test_new_intent_supersedes_live_attempt() {
        let (manager, _) = setup();
        let first = intent(&manager, Some(10));
        let second = intent(&manager, Some(10));

        let first = manager.get(first.payment.id).unwrap();
        assert_eq!(first.status, PaymentStatus::Cancelled);
        assert!(first
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("superseded"));
        assert_eq!(second.payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_sync_completes_payment_once() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, Some(10));
        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);

        let outcome = manager.sync_from_gateway("pi_1").unwrap();
        assert!(outcome.newly_completed);
        assert_eq!(outcome.payment.status, PaymentStatus::Completed);
        assert!(outcome.payment.processed_at.is_some());
        assert_eq!(outcome.payment.external_status.as_deref(), Some("succeeded"));

        // Second delivery of the same status is a no-op
        let again = manager.sync_from_gateway("pi_1").unwrap();
        assert!(!again.newly_completed);
        assert_eq!(again.payment.status, PaymentStatus::Completed);

        let _ = receipt;
    }

    #[test]
    fn test_sync_failure_records_reason() {
        let (manager, gateway) = setup();
        intent(&manager, None);
        gateway.set_status("pi_1", GatewayPaymentStatus::RequiresPaymentMethod);

        let outcome = manager.sync_from_gateway("pi_1").unwrap();
        assert_eq!(outcome.payment.status, PaymentStatus::Failed);
        assert!(outcome
            .payment
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("requires_payment_method"));
    }

    #[test]
    fn test_sync_unknown_reference() {
        let (manager, _) = setup();
        let err = manager.sync_from_gateway("pi_404").unwrap_err();
        assert_eq!(err, RentalError::unknown_external_reference("pi_404"));
    }

    #[test]
    fn test_sync_never_overwrites_offline_approval() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, None);
        manager
            .approve_offline(receipt.payment.id, 99, Some("cash at desk".to_string()))
            .unwrap();

        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);
        let outcome = manager.sync_from_gateway("pi_1").unwrap();
        assert_eq!(outcome.payment.status, PaymentStatus::ApprovedOffline);
        assert!(!outcome.newly_completed);
    }

    #[test]
    fn test_offline_approval_records_approver() {
        let (manager, _) = setup();
        let receipt = intent(&manager, None);

        let approved = manager
            .approve_offline(receipt.payment.id, 99, Some("bank transfer seen".to_string()))
            .unwrap();
        assert_eq!(approved.status, PaymentStatus::ApprovedOffline);
        assert_eq!(approved.approved_by, Some(99));
        assert!(approved.approved_at.is_some());
        assert!(approved.processed_at.is_some());
    }

    #[test]
    fn test_double_approval_rejected() {
        let (manager, _) = setup();
        let receipt = intent(&manager, None);
        manager.approve_offline(receipt.payment.id, 99, None).unwrap();

        let err = manager
            .approve_offline(receipt.payment.id, 99, None)
            .unwrap_err();
        assert_eq!(err, RentalError::already_approved(receipt.payment.id));
    }

    #[test]
    fn test_offline_approval_of_completed_rejected() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, None);
        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);
        manager.sync_from_gateway("pi_1").unwrap();

        let err = manager
            .approve_offline(receipt.payment.id, 99, None)
            .unwrap_err();
        assert_eq!(err, RentalError::already_approved(receipt.payment.id));
    }

    #[test]
    fn test_record_offline_payment_is_born_approved() {
        let (manager, _) = setup();
        let payment = manager
            .record_offline_payment(
                7,
                Some(10),
                Decimal::new(20000, 2),
                "PLN",
                PaymentKind::Deposit,
                PaymentMethod::BankTransfer,
                99,
                None,
            )
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::ApprovedOffline);
        assert_eq!(payment.approved_by, Some(99));
        assert!(payment.external_ref.is_none());
    }

    #[test]
    fn test_admin_cancel_of_completed_refunds() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, None);
        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);
        manager.sync_from_gateway("pi_1").unwrap();

        let outcome = manager.cancel_by_admin(receipt.payment.id, 99).unwrap();
        assert_eq!(outcome.refund, RefundDisposition::Refunded);
        assert_eq!(outcome.payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_admin_cancel_refund_fallback() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, None);
        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);
        manager.sync_from_gateway("pi_1").unwrap();
        gateway.fail_refunds(true);

        let outcome = manager.cancel_by_admin(receipt.payment.id, 99).unwrap();
        assert!(matches!(
            outcome.refund,
            RefundDisposition::FallbackCancelled { .. }
        ));
        assert_eq!(outcome.payment.status, PaymentStatus::Cancelled);
        assert!(outcome.payment.failure_reason.is_some());
    }

    #[test]
    fn test_admin_cancel_of_pending_skips_gateway() {
        let (manager, _) = setup();
        let receipt = intent(&manager, None);

        let outcome = manager.cancel_by_admin(receipt.payment.id, 99).unwrap();
        assert_eq!(outcome.refund, RefundDisposition::NotAttempted);
        assert_eq!(outcome.payment.status, PaymentStatus::Cancelled);
    }

    #[test]
    fn test_admin_cancel_of_refunded_rejected() {
        let (manager, gateway) = setup();
        let receipt = intent(&manager, None);
        gateway.set_status("pi_1", GatewayPaymentStatus::Succeeded);
        manager.sync_from_gateway("pi_1").unwrap();
        manager.cancel_by_admin(receipt.payment.id, 99).unwrap();

        let err = manager.cancel_by_admin(receipt.payment.id, 99).unwrap_err();
        assert!(matches!(err, RentalError::PaymentInvalidState { .. }));
    }
}
