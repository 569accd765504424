//! Wallet and ledger entry data models.
//!
//! This module defines:
//! - `Wallet`: the per-user balance row
//! - `WalletEntry`: one immutable credit or debit against a wallet
//! - `Currency` and `EntryType`: closed sets backing the varchar columns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Currencies a wallet can hold.
///
/// `USD` is real money in minor units (cents); `COIN` is the platform's
/// internal token. There is no conversion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Coin,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Coin => write!(f, "COIN"),
        }
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Credit,
    Debit,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Credit => write!(f, "credit"),
            EntryType::Debit => write!(f, "debit"),
        }
    }
}

/// Represents a wallet record from the database.
///
/// # Database Table
///
/// Maps to the `wallets` table. One wallet per user, created at signup with
/// a zero balance.
///
/// # Balance Storage
///
/// Balances are stored as `i64` minor units (cents for USD) to avoid
/// floating-point precision issues. The balance is fully determined by the
/// wallet's entries: sum of credits minus sum of debits, and is never
/// negative (also enforced by a database CHECK constraint).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// Owner of the wallet; unique, so user id resolves to one wallet
    pub owner_user_id: Uuid,

    /// Currency this wallet holds
    pub currency: Currency,

    /// Current balance in minor units
    pub balance_minor: i64,

    /// Monotonic counter bumped on every balance write.
    ///
    /// Writers condition their update on the version they read, so a lost
    /// update shows up as zero rows affected instead of silently clobbering
    /// a concurrent write.
    pub version: i64,

    /// Timestamp when the wallet was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last balance update
    pub updated_at: DateTime<Utc>,
}

/// One immutable ledger entry against a wallet.
///
/// Entries are never updated or deleted; they are the sole source of truth
/// for the wallet balance.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WalletEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// Wallet the entry was posted against
    pub wallet_id: Uuid,

    /// Credit or debit
    pub entry_type: EntryType,

    /// Amount in minor units; always positive, direction comes from `entry_type`
    pub amount_minor: i64,

    /// Why the entry was posted (refund, payout disbursement, adjustment...)
    pub reason: String,

    /// Admin who caused the entry; NULL for user-initiated flows
    pub acting_admin_id: Option<Uuid>,

    /// When the entry was posted
    pub created_at: DateTime<Utc>,
}
