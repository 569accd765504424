//! Audit trail data model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One administrative financial action, as recorded in `audit_log`.
///
/// Rows are append-only: the application never updates or deletes them, and
/// a database trigger rejects UPDATE/DELETE as a backstop. Each admin
/// mutation commits exactly one record in the same transaction as its
/// primary writes.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuditRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Admin who performed the action
    pub actor_admin_id: Uuid,

    /// Action name, e.g. `wallet.credit`, `payout.approve`,
    /// `transaction.refund`, `order.release_escrow`
    pub action: String,

    /// Entity kind the action targeted (`wallet`, `payout`, ...)
    pub target_entity: String,

    /// ID of the targeted entity
    pub target_id: Uuid,

    /// Snapshot of the mutation's inputs and effects
    pub payload: serde_json::Value,

    /// When the action was recorded
    pub created_at: DateTime<Utc>,
}
