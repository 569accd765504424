//! Payout lifecycle - request, review, and disbursement.
//!
//! State machine:
//!
//! ```text
//! pending --approve--> approved --process--> processing --mark_paid--> paid
//! pending | approved --reject--> rejected
//! ```
//!
//! `paid` and `rejected` are terminal. The requested amount is reserved
//! from creation until a terminal state: at request and at approve the
//! engine recomputes the user's non-terminal payout total under the wallet
//! row lock and refuses to let it exceed the balance. No wallet entry is
//! posted until `mark_paid`, so a rejection never touches the wallet.

use crate::{
    auth::{AdminContext, Capability},
    db::{self, DbPool},
    error::AppError,
    models::{
        payout::{Payout, PayoutStatus},
        wallet::{Currency, EntryType, Wallet},
    },
    services::{audit_service, notification_service, wallet_service},
};
use serde_json::{Value, json};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Get a payout by ID.
pub async fn get_payout(pool: &DbPool, payout_id: Uuid) -> Result<Payout, AppError> {
    sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1")
        .bind(payout_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::PayoutNotFound)
}

/// Create a payout request for a user.
///
/// User-initiated, so no capability check and no audit record. The wallet
/// row is locked while the reservation invariant is checked so two
/// concurrent requests cannot both fit into the same balance.
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero or negative
/// - `WalletNotFound`: user has no wallet
/// - `CurrencyMismatch`: requested currency differs from the wallet's
/// - `InsufficientFunds`: existing non-terminal payouts plus this one
///   would exceed the wallet balance
pub async fn request_payout(
    pool: &DbPool,
    user_id: Uuid,
    amount_minor: i64,
    currency: Currency,
    payment_details: Value,
) -> Result<Payout, AppError> {
    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount);
    }

    let mut tx = db::begin(pool).await?;

    let wallet = lock_wallet_for_user(&mut tx, user_id).await?;
    if wallet.currency != currency {
        return Err(AppError::CurrencyMismatch);
    }

    let reserved = reserved_amount(&mut tx, user_id).await?;
    let total = reserved
        .checked_add(amount_minor)
        .ok_or_else(|| AppError::InvalidRequest("reservation overflow".to_string()))?;
    if total > wallet.balance_minor {
        return Err(AppError::InsufficientFunds);
    }

    let payout = sqlx::query_as::<_, Payout>(
        r#"
        INSERT INTO payouts (user_id, amount_minor, currency, payment_details)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(amount_minor)
    .bind(currency)
    .bind(payment_details)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(payout_id = %payout.id, %user_id, amount_minor, "payout requested");
    Ok(payout)
}

/// Approve a pending payout.
///
/// # Process
///
/// 1. Check the `ReviewPayouts` capability
/// 2. Lock the payout row; only `pending` may be approved
/// 3. Lock the wallet row and re-check the reservation invariant: the
///    user's non-terminal payout total (this one included) must still fit
///    into the balance
/// 4. Set `approved`, record the reviewer, write the audit record and the
///    user's notification, commit
///
/// No wallet entry is posted here; funds move at `mark_paid`.
pub async fn approve(
    pool: &DbPool,
    admin: &AdminContext,
    payout_id: Uuid,
) -> Result<Payout, AppError> {
    admin.require(Capability::ReviewPayouts)?;

    let mut tx = db::begin(pool).await?;

    let payout = lock_payout(&mut tx, payout_id).await?;
    if payout.status != PayoutStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "approve requires a pending payout, found {}",
            payout.status
        )));
    }

    let wallet = lock_wallet_for_user(&mut tx, payout.user_id).await?;
    let reserved = reserved_amount(&mut tx, payout.user_id).await?;
    if reserved > wallet.balance_minor {
        return Err(AppError::InsufficientFunds);
    }

    let payout = sqlx::query_as::<_, Payout>(
        r#"
        UPDATE payouts
        SET status = 'approved',
            reviewed_at = NOW(),
            reviewing_admin_id = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(payout_id)
    .bind(admin.admin_id)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "payout.approve",
        "payout",
        payout_id,
        json!({
            "user_id": payout.user_id,
            "amount_minor": payout.amount_minor,
            "currency": payout.currency,
        }),
    )
    .await?;

    notification_service::enqueue(
        &mut tx,
        payout.user_id,
        "payout.approved",
        json!({ "payout_id": payout_id, "amount_minor": payout.amount_minor }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%payout_id, admin_id = %admin.admin_id, "payout approved");
    Ok(payout)
}

/// Move an approved payout into processing.
///
/// Marks that an operator has started executing the disbursement with the
/// payment provider.
pub async fn process(
    pool: &DbPool,
    admin: &AdminContext,
    payout_id: Uuid,
) -> Result<Payout, AppError> {
    admin.require(Capability::ReviewPayouts)?;

    let mut tx = db::begin(pool).await?;

    let payout = lock_payout(&mut tx, payout_id).await?;
    if payout.status != PayoutStatus::Approved {
        return Err(AppError::InvalidTransition(format!(
            "process requires an approved payout, found {}",
            payout.status
        )));
    }

    let payout = sqlx::query_as::<_, Payout>(
        "UPDATE payouts SET status = 'processing' WHERE id = $1 RETURNING *",
    )
    .bind(payout_id)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "payout.process",
        "payout",
        payout_id,
        json!({ "user_id": payout.user_id, "amount_minor": payout.amount_minor }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%payout_id, admin_id = %admin.admin_id, "payout processing");
    Ok(payout)
}

/// Record that a processing payout has been paid out.
///
/// Posts the DEBIT wallet entry for the payout amount and stores the
/// provider's reference, all in one transaction with the status change and
/// the audit record. If the wallet cannot cover the amount (the
/// reservation invariant was bypassed by a direct adjustment since
/// approval), everything rolls back.
pub async fn mark_paid(
    pool: &DbPool,
    admin: &AdminContext,
    payout_id: Uuid,
    provider_reference: Value,
) -> Result<Payout, AppError> {
    admin.require(Capability::ReviewPayouts)?;

    let mut tx = db::begin(pool).await?;

    let payout = lock_payout(&mut tx, payout_id).await?;
    if payout.status != PayoutStatus::Processing {
        return Err(AppError::InvalidTransition(format!(
            "mark_paid requires a processing payout, found {}",
            payout.status
        )));
    }

    let wallet = lock_wallet_for_user(&mut tx, payout.user_id).await?;

    let balance_after = wallet_service::post_entry_locked(
        &mut tx,
        wallet.id,
        EntryType::Debit,
        payout.amount_minor,
        "payout disbursement",
        Some(admin.admin_id),
    )
    .await?;

    let payout = sqlx::query_as::<_, Payout>(
        r#"
        UPDATE payouts
        SET status = 'paid',
            paid_at = NOW(),
            provider_reference = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(payout_id)
    .bind(&provider_reference)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "payout.mark_paid",
        "payout",
        payout_id,
        json!({
            "user_id": payout.user_id,
            "amount_minor": payout.amount_minor,
            "provider_reference": provider_reference,
            "balance_after": balance_after,
        }),
    )
    .await?;

    notification_service::enqueue(
        &mut tx,
        payout.user_id,
        "payout.paid",
        json!({ "payout_id": payout_id, "amount_minor": payout.amount_minor }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%payout_id, admin_id = %admin.admin_id, "payout paid");
    Ok(payout)
}

/// Reject a pending or approved payout.
///
/// Never touches the wallet: no entry was posted before payment, so there
/// is nothing to reverse. The reservation lapses because rejected payouts
/// no longer count toward the non-terminal total.
pub async fn reject(
    pool: &DbPool,
    admin: &AdminContext,
    payout_id: Uuid,
    reason: &str,
) -> Result<Payout, AppError> {
    admin.require(Capability::ReviewPayouts)?;

    let mut tx = db::begin(pool).await?;

    let payout = lock_payout(&mut tx, payout_id).await?;
    if !matches!(
        payout.status,
        PayoutStatus::Pending | PayoutStatus::Approved
    ) {
        return Err(AppError::InvalidTransition(format!(
            "reject requires a pending or approved payout, found {}",
            payout.status
        )));
    }

    let payout = sqlx::query_as::<_, Payout>(
        r#"
        UPDATE payouts
        SET status = 'rejected',
            reviewed_at = NOW(),
            reviewing_admin_id = $2,
            reject_reason = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(payout_id)
    .bind(admin.admin_id)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "payout.reject",
        "payout",
        payout_id,
        json!({
            "user_id": payout.user_id,
            "amount_minor": payout.amount_minor,
            "reason": reason,
        }),
    )
    .await?;

    notification_service::enqueue(
        &mut tx,
        payout.user_id,
        "payout.rejected",
        json!({ "payout_id": payout_id, "reason": reason }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%payout_id, admin_id = %admin.admin_id, "payout rejected");
    Ok(payout)
}

/// Lock a payout row for the duration of the transaction.
async fn lock_payout(
    tx: &mut Transaction<'_, Postgres>,
    payout_id: Uuid,
) -> Result<Payout, AppError> {
    sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1 FOR UPDATE")
        .bind(payout_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::PayoutNotFound)
}

/// Lock a user's wallet row for the duration of the transaction.
async fn lock_wallet_for_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE owner_user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::WalletNotFound)
}

/// Sum of the user's non-terminal payout amounts.
///
/// Includes the payout being examined when it is itself non-terminal.
async fn reserved_amount(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<i64, AppError> {
    let reserved: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_minor), 0)::BIGINT
        FROM payouts
        WHERE user_id = $1 AND status IN ('pending', 'approved', 'processing')
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(reserved)
}
