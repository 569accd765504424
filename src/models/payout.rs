//! Payout data model and lifecycle states.

use crate::models::wallet::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payout lifecycle states.
///
/// ```text
/// pending --approve--> approved --process--> processing --mark_paid--> paid
/// pending | approved --reject--> rejected
/// ```
///
/// `paid` and `rejected` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Processing,
    Paid,
    Rejected,
}

impl PayoutStatus {
    /// Whether the payout has reached a terminal state.
    ///
    /// Non-terminal payouts count toward the user's reserved amount.
    pub fn is_terminal(self) -> bool {
        matches!(self, PayoutStatus::Paid | PayoutStatus::Rejected)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Represents a payout record from the database.
///
/// # Database Table
///
/// Maps to the `payouts` table. The amount is conceptually reserved from
/// request until a terminal state: the sum of a user's non-terminal payout
/// amounts never exceeds the wallet balance. No wallet entry exists until
/// the payout is marked paid.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payout {
    /// Unique identifier for this payout
    pub id: Uuid,

    /// User receiving the payout
    pub user_id: Uuid,

    /// Requested amount in minor units
    pub amount_minor: i64,

    /// Currency, matching the user's wallet
    pub currency: Currency,

    /// Current lifecycle state
    pub status: PayoutStatus,

    /// Opaque destination details supplied with the request (bank account,
    /// PayPal address...); the engine stores but never interprets them
    pub payment_details: serde_json::Value,

    /// Payment provider reference recorded when the payout is marked paid
    pub provider_reference: Option<serde_json::Value>,

    /// Reason supplied on rejection
    pub reject_reason: Option<String>,

    /// When the payout was requested
    pub requested_at: DateTime<Utc>,

    /// When an admin approved or rejected it
    pub reviewed_at: Option<DateTime<Utc>>,

    /// When the disbursement was recorded
    pub paid_at: Option<DateTime<Utc>>,

    /// Admin who reviewed the payout
    pub reviewing_admin_id: Option<Uuid>,
}
