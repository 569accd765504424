//! Notification outbox integration tests.
//!
//! Delivery is out-of-band: these tests verify that financial operations
//! enqueue atomically, that delivery failures stay on the outbox row, and
//! that the financial side is never affected.

mod common;

use common::*;
use creator_finops::config::Config;
use creator_finops::models::notification::OutboxNotification;
use creator_finops::models::wallet::{Currency, EntryType};
use creator_finops::services::{notification_service, wallet_service};
use sqlx::PgPool;
use uuid::Uuid;

fn test_config(notify_url: Option<&str>) -> Config {
    Config {
        database_url: String::new(),
        notify_url: notify_url.map(str::to_string),
        notify_secret: Some("test-secret".to_string()),
        dispatch_interval_secs: 1,
    }
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap()
}

async fn outbox_for_user(pool: &PgPool, user_id: Uuid) -> Vec<OutboxNotification> {
    sqlx::query_as::<_, OutboxNotification>(
        "SELECT * FROM notification_outbox WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

#[sqlx::test]
async fn wallet_adjustment_enqueues_notification(pool: PgPool) {
    let wallet = wallet_with_balance(&pool, Currency::Usd, 0).await;

    wallet_service::credit_debit(
        &pool,
        &super_admin(),
        wallet.id,
        900,
        Currency::Usd,
        EntryType::Credit,
        "promo",
    )
    .await
    .unwrap();

    let rows = outbox_for_user(&pool, wallet.owner_user_id).await;
    // One from the balance seed is absent here (balance started at 0), so
    // the adjustment above is the single event.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "wallet.adjusted");
    assert!(rows[0].delivered_at.is_none());
    assert_eq!(rows[0].payload["amount_minor"], 900);
}

#[sqlx::test]
async fn failed_operation_enqueues_nothing(pool: PgPool) {
    let wallet = wallet_with_balance(&pool, Currency::Usd, 0).await;

    wallet_service::credit_debit(
        &pool,
        &super_admin(),
        wallet.id,
        100,
        Currency::Usd,
        EntryType::Debit,
        "overdraw",
    )
    .await
    .unwrap_err();

    assert!(outbox_for_user(&pool, wallet.owner_user_id).await.is_empty());
}

#[sqlx::test]
async fn no_sink_configured_leaves_queue_untouched(pool: PgPool) {
    let wallet = wallet_with_balance(&pool, Currency::Usd, 500).await;

    let delivered = notification_service::dispatch_pending(&pool, &test_client(), &test_config(None))
        .await
        .unwrap();
    assert_eq!(delivered, 0);

    let rows = outbox_for_user(&pool, wallet.owner_user_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attempts, 0);
    assert!(rows[0].delivered_at.is_none());
}

#[sqlx::test]
async fn unreachable_sink_records_the_failure(pool: PgPool) {
    let wallet = wallet_with_balance(&pool, Currency::Usd, 500).await;

    // Nothing listens on the discard port; every send fails fast.
    let config = test_config(Some("http://127.0.0.1:9/hook"));
    let delivered = notification_service::dispatch_pending(&pool, &test_client(), &config)
        .await
        .unwrap();
    assert_eq!(delivered, 0);

    let rows = outbox_for_user(&pool, wallet.owner_user_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].last_error.is_some());
    assert!(rows[0].delivered_at.is_none());

    // The financial mutation is untouched by the delivery failure.
    let refreshed = wallet_service::get_wallet(&pool, wallet.id).await.unwrap();
    assert_eq!(refreshed.balance_minor, 500);
}
