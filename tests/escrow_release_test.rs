//! Escrow release integration tests.

mod common;

use common::*;
use creator_finops::error::AppError;
use creator_finops::models::order::EscrowStatus;
use creator_finops::models::wallet::Currency;
use creator_finops::services::{audit_service, escrow_service, wallet_service};
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test]
async fn release_credits_seller_minus_fee(pool: PgPool) {
    let seller = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let admin = super_admin();

    let order_id = held_order(&pool, &seller, 6_000, 600).await;

    let order = escrow_service::release(&pool, &admin, order_id).await.unwrap();
    assert_eq!(order.escrow_status, EscrowStatus::Released);
    assert!(order.released_at.is_some());
    assert_eq!(order.releasing_admin_id, Some(admin.admin_id));

    let wallet = wallet_service::get_wallet(&pool, seller.id).await.unwrap();
    assert_eq!(wallet.balance_minor, 5_400);
    assert_eq!(
        wallet_service::ledger_balance(&pool, seller.id).await.unwrap(),
        5_400
    );

    let records = audit_service::find_for_target(&pool, "order", order_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "order.release_escrow");
    assert_eq!(records[0].payload["seller_credit_minor"], 5_400);
}

#[sqlx::test]
async fn second_release_fails_and_posts_nothing(pool: PgPool) {
    let seller = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let admin = super_admin();

    let order_id = held_order(&pool, &seller, 6_000, 600).await;
    escrow_service::release(&pool, &admin, order_id).await.unwrap();

    let entries_before = entry_count(&pool, seller.id).await;

    let err = escrow_service::release(&pool, &admin, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // The seller was not credited twice.
    assert_eq!(entry_count(&pool, seller.id).await, entries_before);
    let wallet = wallet_service::get_wallet(&pool, seller.id).await.unwrap();
    assert_eq!(wallet.balance_minor, 5_400);
}

#[sqlx::test]
async fn fee_equal_to_amount_releases_without_entry(pool: PgPool) {
    let seller = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let admin = super_admin();

    let order_id = held_order(&pool, &seller, 500, 500).await;

    let order = escrow_service::release(&pool, &admin, order_id).await.unwrap();
    assert_eq!(order.escrow_status, EscrowStatus::Released);

    // The whole amount was the platform's share; no zero-amount entry.
    assert_eq!(entry_count(&pool, seller.id).await, 0);
}

#[sqlx::test]
async fn finance_operator_cannot_release(pool: PgPool) {
    let seller = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let order_id = held_order(&pool, &seller, 6_000, 600).await;

    let err = escrow_service::release(&pool, &finance_operator(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let order = escrow_service::get_order(&pool, order_id).await.unwrap();
    assert_eq!(order.escrow_status, EscrowStatus::Held);
}

#[sqlx::test]
async fn unknown_order_rejected(pool: PgPool) {
    let err = escrow_service::release(&pool, &super_admin(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OrderNotFound));
}
