//! Shared fixtures for the integration tests.

use creator_finops::auth::{AdminContext, AdminRole};
use creator_finops::models::wallet::{Currency, EntryType, Wallet};
use creator_finops::services::wallet_service;
use sqlx::PgPool;
use uuid::Uuid;

pub fn super_admin() -> AdminContext {
    AdminContext {
        admin_id: Uuid::new_v4(),
        role: AdminRole::SuperAdmin,
    }
}

pub fn finance_operator() -> AdminContext {
    AdminContext {
        admin_id: Uuid::new_v4(),
        role: AdminRole::FinanceOperator,
    }
}

pub fn support_admin() -> AdminContext {
    AdminContext {
        admin_id: Uuid::new_v4(),
        role: AdminRole::Support,
    }
}

/// Open a wallet for a fresh user and seed it with a balance through the
/// ledger, so the entry/balance invariant holds from the start.
pub async fn wallet_with_balance(pool: &PgPool, currency: Currency, balance_minor: i64) -> Wallet {
    let wallet = wallet_service::open_wallet(pool, Uuid::new_v4(), currency)
        .await
        .expect("open wallet");

    if balance_minor > 0 {
        wallet_service::credit_debit(
            pool,
            &super_admin(),
            wallet.id,
            balance_minor,
            currency,
            EntryType::Credit,
            "test seed",
        )
        .await
        .expect("seed balance");
    }

    wallet_service::get_wallet(pool, wallet.id)
        .await
        .expect("refresh wallet")
}

/// Insert a completed product purchase between two wallet owners.
pub async fn completed_transaction(
    pool: &PgPool,
    payer: &Wallet,
    payee: &Wallet,
    amount_minor: i64,
    platform_fee_minor: i64,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO transactions (
            payer_id, payee_id, amount_minor, currency, status, product_id,
            platform_fee_minor, original_price_minor, price_with_fee_minor, balance_status
        )
        VALUES ($1, $2, $3, $4, 'completed', $5, $6, $7, $8, 'available')
        RETURNING id
        "#,
    )
    .bind(payer.owner_user_id)
    .bind(payee.owner_user_id)
    .bind(amount_minor)
    .bind(payer.currency)
    .bind(Uuid::new_v4())
    .bind(platform_fee_minor)
    .bind(amount_minor)
    .bind(amount_minor)
    .fetch_one(pool)
    .await
    .expect("insert transaction")
}

/// Insert a marketplace order with funds still held in escrow.
pub async fn held_order(
    pool: &PgPool,
    seller: &Wallet,
    amount_minor: i64,
    platform_fee_minor: i64,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO orders (buyer_id, seller_id, amount_minor, platform_fee_minor, currency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(seller.owner_user_id)
    .bind(amount_minor)
    .bind(platform_fee_minor)
    .bind(seller.currency)
    .fetch_one(pool)
    .await
    .expect("insert order")
}

/// Count the ledger entries posted against a wallet.
pub async fn entry_count(pool: &PgPool, wallet_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM wallet_entries WHERE wallet_id = $1")
        .bind(wallet_id)
        .fetch_one(pool)
        .await
        .expect("count entries")
}
