//! Marketplace order data model.
//!
//! Order funds are held by the platform until an admin releases them to the
//! seller. Orders are created at placement by the marketplace (external);
//! the engine's only mutation is the one-way escrow release.

use crate::models::wallet::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Escrow states for order funds. Release is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Held,
    Released,
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscrowStatus::Held => write!(f, "held"),
            EscrowStatus::Released => write!(f, "released"),
        }
    }
}

/// Represents a marketplace order record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Order {
    /// Unique identifier for this order
    pub id: Uuid,

    /// Buyer
    pub buyer_id: Uuid,

    /// Seller whose wallet receives the released funds
    pub seller_id: Uuid,

    /// Order amount in minor units
    pub amount_minor: i64,

    /// Platform's retained share; the seller is credited amount minus this
    pub platform_fee_minor: i64,

    /// Currency of the order
    pub currency: Currency,

    /// Whether the funds are still held or have been released
    pub escrow_status: EscrowStatus,

    /// When the order was placed
    pub created_at: DateTime<Utc>,

    /// When the escrow was released
    pub released_at: Option<DateTime<Utc>>,

    /// Admin who released the escrow
    pub releasing_admin_id: Option<Uuid>,
}
