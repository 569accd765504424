//! Audit trail writes.
//!
//! Every admin-mediated mutation records exactly one audit row. The insert
//! runs inside the caller's open database transaction, so the audit record
//! and the primary mutation become durable together or not at all. A
//! failure here is fatal to the enclosing operation.

use crate::{db::DbPool, error::AppError, models::audit::AuditRecord};
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Append one audit record inside the caller's transaction.
///
/// # Arguments
///
/// * `tx` - Open transaction of the enclosing financial operation
/// * `actor_admin_id` - Verified admin performing the action
/// * `action` - Action name, e.g. `payout.approve`
/// * `target_entity` - Entity kind, e.g. `payout`
/// * `target_id` - ID of the targeted entity
/// * `payload` - Snapshot of the mutation's inputs and effects
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    actor_admin_id: Uuid,
    action: &str,
    target_entity: &str,
    target_id: Uuid,
    payload: Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (actor_admin_id, action, target_entity, target_id, payload)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(actor_admin_id)
    .bind(action)
    .bind(target_entity)
    .bind(target_id)
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Fetch the audit records for one entity, newest first.
pub async fn find_for_target(
    pool: &DbPool,
    target_entity: &str,
    target_id: Uuid,
) -> Result<Vec<AuditRecord>, AppError> {
    let records = sqlx::query_as::<_, AuditRecord>(
        "SELECT * FROM audit_log WHERE target_entity = $1 AND target_id = $2 ORDER BY created_at DESC",
    )
    .bind(target_entity)
    .bind(target_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
