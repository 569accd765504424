//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Opening engine transactions with a bounded lock wait

use crate::error::AppError;
use sqlx::{Pool, Postgres, Transaction};

/// Type alias for PostgreSQL connection pool.
///
/// Instead of writing `Pool<Postgres>` everywhere, we can use `DbPool`.
pub type DbPool = Pool<Postgres>;

/// Upper bound on how long an engine transaction waits for a row lock.
///
/// When the wait expires, Postgres aborts the statement with error 55P03,
/// which the error layer surfaces as the retryable [`AppError::Busy`].
const SET_LOCK_TIMEOUT: &str = "SET LOCAL lock_timeout = '5s'";

/// Create a new PostgreSQL connection pool.
///
/// A connection pool maintains multiple database connections that can be
/// reused across requests, which is much more efficient than opening a new
/// connection for each operation.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        // Limit concurrent connections
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// This function executes all SQL migration files in order. Migrations are
/// tracked in a special `_sqlx_migrations` table, so each migration runs
/// only once.
///
/// # Migration Files
///
/// Migration files must be in `migrations/` directory with format:
/// - `<timestamp>_<name>.sql` (e.g., `20260801000001_create_wallets.sql`)
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

/// Begin a database transaction with the engine's lock wait bound applied.
///
/// Every multi-statement engine operation goes through here so that no
/// operation can block indefinitely behind another session's row locks.
/// `SET LOCAL` scopes the timeout to this transaction only.
pub async fn begin(pool: &DbPool) -> Result<Transaction<'_, Postgres>, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query(SET_LOCK_TIMEOUT).execute(&mut *tx).await?;
    Ok(tx)
}
