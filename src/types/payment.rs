//! Payment types, lifecycle state machine, and gateway status mapping
//!
//! This module defines the `PaymentRecord`, its status enum with the
//! central transition table, and [`GatewayPaymentStatus`] - the only place
//! where the gateway's status vocabulary is allowed to leak into the core.
//!
//! # Success paths
//!
//! A payment can settle two mutually exclusive ways: gateway completion
//! (`Pending/Processing -> Completed`) or manual offline approval
//! (`-> ApprovedOffline`, recorded with an approver identity and
//! timestamp). Both feed the reconciliation coordinator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::booking::BookingId;
use super::error::UserId;

/// Payment identifier, assigned sequentially by the payment store
pub type PaymentId = u64;

/// Payment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, awaiting the payer's action
    Pending,

    /// The gateway is working on it
    Processing,

    /// Gateway-side success; terminal except for an administrative refund
    Completed,

    /// Gateway-side failure; the payer may start a new attempt
    Failed,

    /// Abandoned, superseded, or administratively withdrawn; terminal
    Cancelled,

    /// Administrative reversal of a completed gateway payment; terminal
    Refunded,

    /// Settled manually (cash/bank transfer) by a privileged approver;
    /// terminal except for an administrative cancellation
    ApprovedOffline,
}

/// Events that drive payment status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// The gateway started working on the attempt
    BeginProcessing,
    /// Gateway-side success
    Succeed,
    /// Gateway-side failure
    Fail,
    /// Abandonment, supersession, or administrative withdrawal
    Cancel,
    /// Administrative reversal through the gateway
    Refund,
    /// Manual settlement by a privileged approver
    ApproveOffline,
}

impl PaymentStatus {
    /// The central transition table: `(current, event) -> Option<next>`
    ///
    /// The only place in the crate that encodes payment lifecycle
    /// legality. Gateway-reported statuses are first mapped through
    /// [`GatewayPaymentStatus::to_local`] and applied idempotently by the
    /// payment manager.
    pub fn transition(self, event: PaymentEvent) -> Option<PaymentStatus> {
        use PaymentEvent::*;
        use PaymentStatus::*;

        match (self, event) {
            (Pending, BeginProcessing) => Some(Processing),
            (Pending, Succeed) | (Processing, Succeed) => Some(Completed),
            (Pending, Fail) | (Processing, Fail) => Some(Failed),
            (Pending, Cancel)
            | (Processing, Cancel)
            | (Completed, Cancel)
            | (ApprovedOffline, Cancel) => Some(Cancelled),
            (Completed, Refund) => Some(Refunded),
            (Pending, ApproveOffline)
            | (Processing, ApproveOffline)
            | (Failed, ApproveOffline)
            | (Cancelled, ApproveOffline) => Some(ApprovedOffline),
            _ => None,
        }
    }

    /// Whether the payment has settled successfully (either path)
    pub fn is_successful(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::ApprovedOffline)
    }

    /// Whether a new attempt for the same booking supersedes this one
    pub fn is_live_attempt(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    /// Lowercase name as stored in CSV output
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::ApprovedOffline => "approved_offline",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the payment is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Online payment through the external gateway
    Gateway,
    /// Cash handled in person, approved by an administrator
    Offline,
    /// Bank transfer, approved by an administrator
    BankTransfer,
}

/// What the payment is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Payment for a booking's rental total
    Rental,
    /// Stand-alone security deposit charge (may exist without a booking)
    Deposit,
}

/// Gateway status vocabulary
///
/// Mirrors the external gateway's payment-intent statuses. This enum and
/// [`GatewayPaymentStatus::to_local`] are the only places gateway
/// vocabulary appears; everything else speaks [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Canceled,
}

impl GatewayPaymentStatus {
    /// The fixed mapping table from gateway vocabulary to local statuses
    pub fn to_local(self) -> PaymentStatus {
        match self {
            GatewayPaymentStatus::Succeeded => PaymentStatus::Completed,
            GatewayPaymentStatus::Processing => PaymentStatus::Processing,
            GatewayPaymentStatus::RequiresPaymentMethod => PaymentStatus::Failed,
            GatewayPaymentStatus::RequiresConfirmation | GatewayPaymentStatus::RequiresAction => {
                PaymentStatus::Pending
            }
            GatewayPaymentStatus::Canceled => PaymentStatus::Cancelled,
        }
    }

    /// The gateway's own wire name for this status
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayPaymentStatus::Succeeded => "succeeded",
            GatewayPaymentStatus::Processing => "processing",
            GatewayPaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            GatewayPaymentStatus::RequiresConfirmation => "requires_confirmation",
            GatewayPaymentStatus::RequiresAction => "requires_action",
            GatewayPaymentStatus::Canceled => "canceled",
        }
    }
}

impl std::str::FromStr for GatewayPaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(GatewayPaymentStatus::Succeeded),
            "processing" => Ok(GatewayPaymentStatus::Processing),
            "requires_payment_method" => Ok(GatewayPaymentStatus::RequiresPaymentMethod),
            "requires_confirmation" => Ok(GatewayPaymentStatus::RequiresConfirmation),
            "requires_action" => Ok(GatewayPaymentStatus::RequiresAction),
            "canceled" => Ok(GatewayPaymentStatus::Canceled),
            other => Err(format!("unknown gateway status '{}'", other)),
        }
    }
}

/// A payment record
///
/// Owned by the payment lifecycle. A payment may exist without a booking
/// (a stand-alone deposit charge); when it carries one, success states
/// feed the reconciliation coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    /// The payment ID
    pub id: PaymentId,

    /// The booking this payment settles, if any
    pub booking_id: Option<BookingId>,

    /// The paying user (opaque identity reference)
    pub payer: UserId,

    /// Charged amount
    pub amount: Decimal,

    /// ISO currency code (the engine treats it as opaque)
    pub currency: String,

    /// What the payment is for
    pub kind: PaymentKind,

    /// How the payment is settled
    pub method: PaymentMethod,

    /// Current lifecycle state
    pub status: PaymentStatus,

    /// Gateway transaction reference (payment-intent id), gateway method only
    pub external_ref: Option<String>,

    /// Last raw status string reported by the gateway
    pub external_status: Option<String>,

    /// Free-form description
    pub description: Option<String>,

    /// Why the payment failed or fell back, if it did
    pub failure_reason: Option<String>,

    /// Approver identity, offline approval path only
    pub approved_by: Option<UserId>,

    /// When the offline approval was recorded
    pub approved_at: Option<DateTime<Utc>>,

    /// Approver's notes, offline approval path only
    pub approval_notes: Option<String>,

    /// When the payment reached a success state
    pub processed_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Whether the payment has settled successfully (either path)
    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }
}
