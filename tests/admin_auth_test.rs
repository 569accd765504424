//! Admin token authentication integration tests.

use creator_finops::auth::{self, AdminRole};
use creator_finops::error::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test]
async fn issued_token_authenticates(pool: PgPool) {
    let admin_id = Uuid::new_v4();
    let token = auth::issue_admin_token(&pool, admin_id, AdminRole::FinanceOperator)
        .await
        .unwrap();

    let ctx = auth::authenticate_admin(&pool, &token).await.unwrap();
    assert_eq!(ctx.admin_id, admin_id);
    assert_eq!(ctx.role, AdminRole::FinanceOperator);
}

#[sqlx::test]
async fn unknown_token_rejected(pool: PgPool) {
    let err = auth::authenticate_admin(&pool, "not-a-real-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[sqlx::test]
async fn revoked_token_rejected(pool: PgPool) {
    let admin_id = Uuid::new_v4();
    let token = auth::issue_admin_token(&pool, admin_id, AdminRole::SuperAdmin)
        .await
        .unwrap();

    sqlx::query("UPDATE admin_tokens SET is_active = false WHERE admin_id = $1")
        .bind(admin_id)
        .execute(&pool)
        .await
        .unwrap();

    let err = auth::authenticate_admin(&pool, &token).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[sqlx::test]
async fn plaintext_token_is_never_stored(pool: PgPool) {
    let token = auth::issue_admin_token(&pool, Uuid::new_v4(), AdminRole::Support)
        .await
        .unwrap();

    let stored: String = sqlx::query_scalar("SELECT token_hash FROM admin_tokens LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, token);
    assert_eq!(stored.len(), 64);
}
