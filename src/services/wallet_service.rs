//! Wallet ledger - core balance bookkeeping.
//!
//! This service owns:
//! - Wallet creation at user signup
//! - Admin credit/debit adjustments
//! - Entry posting for the other engines (payout, refund, escrow)
//!
//! # Consistency
//!
//! The wallet balance equals the sum of credit entries minus the sum of
//! debit entries, and never goes negative. Single-wallet admin adjustments
//! serialize through a compare-and-swap on the wallet's version column;
//! composite operations hold a `FOR UPDATE` row lock for the duration of
//! their transaction and post entries through [`post_entry_locked`].

use crate::{
    auth::{AdminContext, Capability},
    db::{self, DbPool},
    error::AppError,
    models::wallet::{Currency, EntryType, Wallet},
    services::{audit_service, notification_service},
};
use serde_json::json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// How many times a credit/debit re-reads and retries after losing the
/// version race before giving up with `ConcurrentModification`.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Create a wallet for a new user with a zero balance.
///
/// Called once at signup. A second wallet for the same user is rejected;
/// the unique constraint on `owner_user_id` backs this up.
pub async fn open_wallet(
    pool: &DbPool,
    owner_user_id: Uuid,
    currency: Currency,
) -> Result<Wallet, AppError> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM wallets WHERE owner_user_id = $1")
        .bind(owner_user_id)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::InvalidRequest(
            "user already has a wallet".to_string(),
        ));
    }

    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (owner_user_id, currency)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(owner_user_id)
    .bind(currency)
    .fetch_one(pool)
    .await?;

    Ok(wallet)
}

/// Get a wallet by ID.
pub async fn get_wallet(pool: &DbPool, wallet_id: Uuid) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1")
        .bind(wallet_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::WalletNotFound)
}

/// Get a user's wallet.
pub async fn get_wallet_for_user(pool: &DbPool, user_id: Uuid) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE owner_user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::WalletNotFound)
}

/// Execute an administrative credit or debit against a wallet.
///
/// # Process
///
/// 1. Check the `ManageWallets` capability and validate the amount
/// 2. Read the wallet; validate currency and, for debits, the balance
/// 3. Conditionally update balance and version (compare-and-swap)
/// 4. On version conflict: re-read and retry, bounded
/// 5. On success: insert the ledger entry, the audit record, and the
///    owner's notification in the same transaction, then commit
///
/// # Errors
///
/// - `Forbidden`: role lacks `ManageWallets`
/// - `InvalidAmount`: amount is zero or negative
/// - `WalletNotFound`: wallet doesn't exist
/// - `CurrencyMismatch`: supplied currency differs from the wallet's
/// - `InsufficientFunds`: debit exceeds the current balance
/// - `ConcurrentModification`: lost the version race on every attempt
///
/// # Returns
///
/// The post-operation balance in minor units.
pub async fn credit_debit(
    pool: &DbPool,
    admin: &AdminContext,
    wallet_id: Uuid,
    amount_minor: i64,
    currency: Currency,
    entry_type: EntryType,
    reason: &str,
) -> Result<i64, AppError> {
    admin.require(Capability::ManageWallets)?;

    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount);
    }

    for attempt in 0..MAX_CAS_ATTEMPTS {
        let wallet = get_wallet(pool, wallet_id).await?;

        if wallet.currency != currency {
            return Err(AppError::CurrencyMismatch);
        }

        let new_balance = match entry_type {
            EntryType::Credit => wallet
                .balance_minor
                .checked_add(amount_minor)
                .ok_or_else(|| AppError::InvalidRequest("balance overflow".to_string()))?,
            EntryType::Debit => {
                if wallet.balance_minor < amount_minor {
                    return Err(AppError::InsufficientFunds);
                }
                wallet.balance_minor - amount_minor
            }
        };

        // Even the conditional update can wait on a composite operation's
        // row lock, so the bounded-wait transaction applies here too.
        let mut tx = db::begin(pool).await?;

        // Conditional on the version read above. Zero rows affected means a
        // concurrent writer committed first; re-read and try again.
        let claimed = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_minor = $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(new_balance)
        .bind(wallet_id)
        .bind(wallet.version)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            tracing::debug!(%wallet_id, attempt, "wallet version moved, retrying");
            continue;
        }

        insert_entry(
            &mut tx,
            wallet_id,
            entry_type,
            amount_minor,
            reason,
            Some(admin.admin_id),
        )
        .await?;

        let action = match entry_type {
            EntryType::Credit => "wallet.credit",
            EntryType::Debit => "wallet.debit",
        };
        audit_service::record(
            &mut tx,
            admin.admin_id,
            action,
            "wallet",
            wallet_id,
            json!({
                "amount_minor": amount_minor,
                "currency": currency,
                "reason": reason,
                "balance_after": new_balance,
            }),
        )
        .await?;

        notification_service::enqueue(
            &mut tx,
            wallet.owner_user_id,
            "wallet.adjusted",
            json!({
                "wallet_id": wallet_id,
                "entry_type": entry_type,
                "amount_minor": amount_minor,
                "balance_minor": new_balance,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(%wallet_id, %entry_type, amount_minor, "wallet adjusted");
        return Ok(new_balance);
    }

    Err(AppError::ConcurrentModification)
}

/// Post a ledger entry against a wallet inside an enclosing transaction.
///
/// For the composite engines (payout payment, refund, escrow release),
/// whose entries must commit atomically with their lifecycle writes. Takes
/// the wallet row lock with `FOR UPDATE`; re-acquiring a lock this
/// transaction already holds is a no-op, so callers that pre-locked the
/// row (e.g. for ordered two-wallet locking) can call this directly.
///
/// The version column is still bumped so concurrent compare-and-swap
/// writers observe the change.
///
/// # Returns
///
/// The post-entry balance in minor units.
pub(crate) async fn post_entry_locked(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: Uuid,
    entry_type: EntryType,
    amount_minor: i64,
    reason: &str,
    acting_admin_id: Option<Uuid>,
) -> Result<i64, AppError> {
    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount);
    }

    let balance: i64 =
        sqlx::query_scalar("SELECT balance_minor FROM wallets WHERE id = $1 FOR UPDATE")
            .bind(wallet_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(AppError::WalletNotFound)?;

    let new_balance = match entry_type {
        EntryType::Credit => balance
            .checked_add(amount_minor)
            .ok_or_else(|| AppError::InvalidRequest("balance overflow".to_string()))?,
        EntryType::Debit => {
            if balance < amount_minor {
                return Err(AppError::InsufficientFunds);
            }
            balance - amount_minor
        }
    };

    sqlx::query(
        r#"
        UPDATE wallets
        SET balance_minor = $1,
            version = version + 1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(new_balance)
    .bind(wallet_id)
    .execute(&mut **tx)
    .await?;

    insert_entry(tx, wallet_id, entry_type, amount_minor, reason, acting_admin_id).await?;

    Ok(new_balance)
}

/// Recompute a wallet's balance from its entries.
///
/// Sum of credits minus sum of debits. Used for reconciliation; the result
/// must always equal the stored `balance_minor`.
pub async fn ledger_balance(pool: &DbPool, wallet_id: Uuid) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN entry_type = 'credit' THEN amount_minor ELSE -amount_minor END
        ), 0)::BIGINT
        FROM wallet_entries
        WHERE wallet_id = $1
        "#,
    )
    .bind(wallet_id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: Uuid,
    entry_type: EntryType,
    amount_minor: i64,
    reason: &str,
    acting_admin_id: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO wallet_entries (wallet_id, entry_type, amount_minor, reason, acting_admin_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(wallet_id)
    .bind(entry_type)
    .bind(amount_minor)
    .bind(reason)
    .bind(acting_admin_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
