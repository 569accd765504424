//! Purchase/subscription transaction data model.
//!
//! Transactions are created at checkout by the storefront (external to this
//! crate); the engine's only mutation is the one-shot refund.

use crate::models::wallet::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transaction settlement states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Where the payee's share of the funds currently sits.
///
/// `incoming` funds are inside the platform's settlement window;
/// `available` funds have landed in the payee's wallet. Informational for
/// this engine: refund eligibility keys on [`TransactionStatus`] alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    Incoming,
    Available,
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Moves `amount_minor` from payer to payee, of which the platform
///   retains `platform_fee_minor`
/// - References exactly one of a product or a subscription (CHECK-enforced)
/// - Is refundable only from `completed`, and at most once
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// Buyer
    pub payer_id: Uuid,

    /// Seller/creator
    pub payee_id: Uuid,

    /// Gross amount in minor units
    pub amount_minor: i64,

    /// Currency of the purchase
    pub currency: Currency,

    /// Settlement state
    pub status: TransactionStatus,

    /// Product purchased; NULL when this is a subscription charge
    pub product_id: Option<Uuid>,

    /// Subscription charged; NULL when this is a product purchase
    pub subscription_id: Option<Uuid>,

    /// Platform's retained share of the amount, in minor units.
    ///
    /// Not returned on refund: the payer gets the full amount back, the
    /// payee is debited amount minus this fee.
    pub platform_fee_minor: i64,

    /// Listed price before fees
    pub original_price_minor: i64,

    /// Price the payer was charged including the buyer-side fee
    pub price_with_fee_minor: i64,

    /// Settlement window position of the payee's share
    pub balance_status: BalanceStatus,

    /// Reason supplied by the refunding admin
    pub refund_reason: Option<String>,

    /// Admin who issued the refund
    pub refunding_admin_id: Option<Uuid>,

    /// When the transaction was created at checkout
    pub created_at: DateTime<Utc>,

    /// When the refund was applied
    pub refunded_at: Option<DateTime<Utc>>,
}
