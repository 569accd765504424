//! Transaction refund integration tests.

mod common;

use common::*;
use creator_finops::error::AppError;
use creator_finops::models::transaction::TransactionStatus;
use creator_finops::models::wallet::Currency;
use creator_finops::services::{audit_service, refund_service, wallet_service};
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test]
async fn refund_reverses_both_sides_minus_fee(pool: PgPool) {
    let payer = wallet_with_balance(&pool, Currency::Usd, 0).await;
    // At checkout the payee was credited net of the fee; seed that state.
    let payee = wallet_with_balance(&pool, Currency::Usd, 1_800).await;
    let admin = super_admin();

    let transaction_id = completed_transaction(&pool, &payer, &payee, 2_000, 200).await;

    let txn = refund_service::refund(&pool, &admin, transaction_id, "item not delivered")
        .await
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Refunded);
    assert!(txn.refunded_at.is_some());
    assert_eq!(txn.refunding_admin_id, Some(admin.admin_id));

    // Payer gets the full amount back; the payee gives up the net share,
    // the platform keeps the fee.
    let payer_after = wallet_service::get_wallet(&pool, payer.id).await.unwrap();
    let payee_after = wallet_service::get_wallet(&pool, payee.id).await.unwrap();
    assert_eq!(payer_after.balance_minor, 2_000);
    assert_eq!(payee_after.balance_minor, 0);

    for wallet_id in [payer.id, payee.id] {
        let stored = wallet_service::get_wallet(&pool, wallet_id).await.unwrap();
        let from_entries = wallet_service::ledger_balance(&pool, wallet_id).await.unwrap();
        assert_eq!(stored.balance_minor, from_entries);
    }

    let records = audit_service::find_for_target(&pool, "transaction", transaction_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "transaction.refund");
    assert_eq!(records[0].payload["payee_debit_minor"], 1_800);
}

#[sqlx::test]
async fn second_refund_fails_and_posts_nothing(pool: PgPool) {
    let payer = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let payee = wallet_with_balance(&pool, Currency::Usd, 1_800).await;
    let admin = super_admin();

    let transaction_id = completed_transaction(&pool, &payer, &payee, 2_000, 200).await;
    refund_service::refund(&pool, &admin, transaction_id, "first").await.unwrap();

    let payer_entries = entry_count(&pool, payer.id).await;
    let payee_entries = entry_count(&pool, payee.id).await;

    let err = refund_service::refund(&pool, &admin, transaction_id, "second")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyRefunded));

    assert_eq!(entry_count(&pool, payer.id).await, payer_entries);
    assert_eq!(entry_count(&pool, payee.id).await, payee_entries);

    let payer_after = wallet_service::get_wallet(&pool, payer.id).await.unwrap();
    assert_eq!(payer_after.balance_minor, 2_000);
}

#[sqlx::test]
async fn only_completed_transactions_are_refundable(pool: PgPool) {
    let payer = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let payee = wallet_with_balance(&pool, Currency::Usd, 5_000).await;
    let admin = super_admin();

    for status in ["pending", "failed"] {
        let transaction_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                payer_id, payee_id, amount_minor, currency, status, product_id,
                platform_fee_minor, original_price_minor, price_with_fee_minor
            )
            VALUES ($1, $2, 1000, 'USD', $3, $4, 100, 1000, 1000)
            RETURNING id
            "#,
        )
        .bind(payer.owner_user_id)
        .bind(payee.owner_user_id)
        .bind(status)
        .bind(Uuid::new_v4())
        .fetch_one(&pool)
        .await
        .unwrap();

        let err = refund_service::refund(&pool, &admin, transaction_id, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    assert_eq!(entry_count(&pool, payer.id).await, 0);
}

#[sqlx::test]
async fn refund_rolls_back_when_payee_cannot_cover(pool: PgPool) {
    let payer = wallet_with_balance(&pool, Currency::Usd, 0).await;
    // Payee already withdrew; only part of the net share is left.
    let payee = wallet_with_balance(&pool, Currency::Usd, 1_000).await;
    let admin = super_admin();

    let transaction_id = completed_transaction(&pool, &payer, &payee, 2_000, 200).await;

    let err = refund_service::refund(&pool, &admin, transaction_id, "too late")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds));

    // Nothing committed: no entries, no status flip, no audit record.
    let txn = refund_service::get_transaction(&pool, transaction_id).await.unwrap();
    assert_eq!(txn.status, TransactionStatus::Completed);

    let payer_after = wallet_service::get_wallet(&pool, payer.id).await.unwrap();
    assert_eq!(payer_after.balance_minor, 0);
    assert_eq!(entry_count(&pool, payer.id).await, 0);

    let records = audit_service::find_for_target(&pool, "transaction", transaction_id)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[sqlx::test]
async fn finance_operator_cannot_refund(pool: PgPool) {
    let payer = wallet_with_balance(&pool, Currency::Usd, 0).await;
    let payee = wallet_with_balance(&pool, Currency::Usd, 1_800).await;

    let transaction_id = completed_transaction(&pool, &payer, &payee, 2_000, 200).await;

    let err = refund_service::refund(&pool, &finance_operator(), transaction_id, "denied")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[sqlx::test]
async fn unknown_transaction_rejected(pool: PgPool) {
    let err = refund_service::refund(&pool, &super_admin(), Uuid::new_v4(), "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound));
}
