//! Escrow release - handing held marketplace order funds to the seller.
//!
//! Order funds sit with the platform from placement until an admin releases
//! them. Release credits the seller's wallet with the order amount minus
//! the platform fee and is strictly one-way.

use crate::{
    auth::{AdminContext, Capability},
    db::{self, DbPool},
    error::AppError,
    models::{
        order::{EscrowStatus, Order},
        wallet::{EntryType, Wallet},
    },
    services::{audit_service, notification_service, wallet_service},
};
use serde_json::json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Get an order by ID.
pub async fn get_order(pool: &DbPool, order_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::OrderNotFound)
}

/// Release an order's escrowed funds to the seller.
///
/// # Process
///
/// 1. Check the `ReleaseEscrow` capability
/// 2. Lock the order row; only `held` funds can be released
/// 3. Credit the seller's wallet with amount minus the platform fee
/// 4. Flip to `released`, write the audit record and the seller's
///    notification, commit
///
/// # Errors
///
/// - `Forbidden`: role lacks `ReleaseEscrow`
/// - `OrderNotFound`
/// - `InvalidState`: funds were already released; release is one-way
/// - `CurrencyMismatch`: the seller's wallet holds a different currency
pub async fn release(
    pool: &DbPool,
    admin: &AdminContext,
    order_id: Uuid,
) -> Result<Order, AppError> {
    admin.require(Capability::ReleaseEscrow)?;

    let mut tx = db::begin(pool).await?;

    let order = lock_order(&mut tx, order_id).await?;
    if order.escrow_status != EscrowStatus::Held {
        return Err(AppError::InvalidState(format!(
            "escrow release requires held funds, found {}",
            order.escrow_status
        )));
    }

    let seller_wallet = sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets WHERE owner_user_id = $1 FOR UPDATE",
    )
    .bind(order.seller_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::WalletNotFound)?;

    if seller_wallet.currency != order.currency {
        return Err(AppError::CurrencyMismatch);
    }

    // Seller receives the order amount net of the platform's share.
    let seller_net = order.amount_minor - order.platform_fee_minor;
    let balance_after = if seller_net > 0 {
        wallet_service::post_entry_locked(
            &mut tx,
            seller_wallet.id,
            EntryType::Credit,
            seller_net,
            "escrow release",
            Some(admin.admin_id),
        )
        .await?
    } else {
        seller_wallet.balance_minor
    };

    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET escrow_status = 'released',
            released_at = NOW(),
            releasing_admin_id = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(admin.admin_id)
    .fetch_one(&mut *tx)
    .await?;

    audit_service::record(
        &mut tx,
        admin.admin_id,
        "order.release_escrow",
        "order",
        order_id,
        json!({
            "seller_id": order.seller_id,
            "amount_minor": order.amount_minor,
            "platform_fee_minor": order.platform_fee_minor,
            "seller_credit_minor": seller_net,
            "balance_after": balance_after,
        }),
    )
    .await?;

    notification_service::enqueue(
        &mut tx,
        order.seller_id,
        "escrow.released",
        json!({ "order_id": order_id, "amount_minor": seller_net }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%order_id, admin_id = %admin.admin_id, "escrow released");
    Ok(order)
}

/// Lock an order row for the duration of the transaction.
async fn lock_order(tx: &mut Transaction<'_, Postgres>, order_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::OrderNotFound)
}
