//! Transaction refunds - reversing a settled purchase or subscription charge.
//!
//! A refund credits the payer's wallet with the full transaction amount and
//! debits the payee's wallet with the amount minus the platform fee the
//! platform already retained. Both entries, the status flip, and the audit
//! record commit together or not at all.

use crate::{
    auth::{AdminContext, Capability},
    db::{self, DbPool},
    error::AppError,
    models::{
        transaction::{Transaction as PlatformTransaction, TransactionStatus},
        wallet::{EntryType, Wallet},
    },
    services::{audit_service, notification_service, wallet_service},
};
use serde_json::json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Get a transaction by ID.
pub async fn get_transaction(
    pool: &DbPool,
    transaction_id: Uuid,
) -> Result<PlatformTransaction, AppError> {
    sqlx::query_as::<_, PlatformTransaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::TransactionNotFound)
}

/// Refund a completed transaction.
///
/// # Process
///
/// 1. Check the `IssueRefunds` capability
/// 2. Lock the transaction row; only `completed` is refundable, and a
///    refunded transaction stays refunded
/// 3. Lock both wallets in ascending wallet-id order
/// 4. Credit the payer the full amount; debit the payee the amount minus
///    the retained platform fee
/// 5. Flip the status, write the audit record and both notifications, commit
///
/// # Errors
///
/// - `Forbidden`: role lacks `IssueRefunds`
/// - `TransactionNotFound`
/// - `AlreadyRefunded`: refunds apply at most once
/// - `InvalidState`: status is not `completed`
/// - `CurrencyMismatch`: a party's wallet holds a different currency
/// - `InsufficientFunds`: the payee wallet cannot cover the net debit;
///   nothing is committed
pub async fn refund(
    pool: &DbPool,
    admin: &AdminContext,
    transaction_id: Uuid,
    reason: &str,
) -> Result<PlatformTransaction, AppError> {
    admin.require(Capability::IssueRefunds)?;

    let mut tx = db::begin(pool).await?;

    let txn = lock_transaction(&mut tx, transaction_id).await?;
    match txn.status {
        TransactionStatus::Refunded => return Err(AppError::AlreadyRefunded),
        TransactionStatus::Completed => {}
        other => {
            return Err(AppError::InvalidState(format!(
                "refund requires a completed transaction, found {other}"
            )));
        }
    }

    let payer_wallet = wallet_for_user(&mut tx, txn.payer_id).await?;
    let payee_wallet = wallet_for_user(&mut tx, txn.payee_id).await?;
    if payer_wallet.currency != txn.currency || payee_wallet.currency != txn.currency {
        return Err(AppError::CurrencyMismatch);
    }

    // Fixed global lock order: ascending wallet id, so two refunds that
    // touch the same pair of wallets in opposite roles cannot deadlock.
    let mut lock_order = [payer_wallet.id, payee_wallet.id];
    lock_order.sort();
    for wallet_id in lock_order {
        sqlx::query("SELECT id FROM wallets WHERE id = $1 FOR UPDATE")
            .bind(wallet_id)
            .execute(&mut *tx)
            .await?;
    }

    wallet_service::post_entry_locked(
        &mut tx,
        payer_wallet.id,
        EntryType::Credit,
        txn.amount_minor,
        "purchase refund",
        Some(admin.admin_id),
    )
    .await?;

    // The platform fee was retained by the platform, not the payee, so the
    // payee gives back only the net share. Zero net means no entry.
    let payee_net = txn.amount_minor - txn.platform_fee_minor;
    if payee_net > 0 {
        wallet_service::post_entry_locked(
            &mut tx,
            payee_wallet.id,
            EntryType::Debit,
            payee_net,
            "purchase refund reversal",
            Some(admin.admin_id),
        )
        .await?;
    }

    let txn = sqlx::query_as::<_, PlatformTransaction>(
        r#"
        UPDATE transactions
        SET status = 'refunded',
            refunded_at = NOW(),
            refunding_admin_id = $2,
            refund_reason = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(transaction_id)
    .bind(admin.admin_id)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "transaction.refund",
        "transaction",
        transaction_id,
        json!({
            "payer_id": txn.payer_id,
            "payee_id": txn.payee_id,
            "amount_minor": txn.amount_minor,
            "platform_fee_minor": txn.platform_fee_minor,
            "payee_debit_minor": payee_net,
            "reason": reason,
        }),
    )
    .await?;

    notification_service::enqueue(
        &mut tx,
        txn.payer_id,
        "refund.issued",
        json!({ "transaction_id": transaction_id, "amount_minor": txn.amount_minor }),
    )
    .await?;
    notification_service::enqueue(
        &mut tx,
        txn.payee_id,
        "refund.reversed",
        json!({ "transaction_id": transaction_id, "amount_minor": payee_net }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%transaction_id, admin_id = %admin.admin_id, "transaction refunded");
    Ok(txn)
}

/// Lock a transaction row for the duration of the database transaction.
async fn lock_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: Uuid,
) -> Result<PlatformTransaction, AppError> {
    sqlx::query_as::<_, PlatformTransaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
        .bind(transaction_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::TransactionNotFound)
}

/// Fetch a party's wallet without locking it; locks are taken afterwards
/// in ascending id order.
async fn wallet_for_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE owner_user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::WalletNotFound)
}
