//! Error types for the financial operations engine.
//!
//! This module defines all engine errors. The HTTP layer (external to this
//! crate) maps each variant to its own status codes; inside the engine the
//! variants carry the retry semantics callers need.
//!
//! # Error Categories
//!
//! - **Validation**: malformed input, rejected immediately, no retry
//! - **State Conflicts**: the entity is not in a state that permits the
//!   operation; the caller must re-fetch before retrying
//! - **Funds**: the wallet cannot cover the requested debit
//! - **Retryable**: bounded lock waits and optimistic-version races; safe
//!   to retry after a short delay
//! - **Identity**: the caller is not a verified admin or lacks a capability
//! - **Storage**: any sqlx error; fatal to the current operation, with all
//!   partial writes rolled back by transaction abort

use thiserror::Error;

/// Engine-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Deliberately not `#[from]`: the conversion below inspects the error
    /// so lock-wait timeouts become [`AppError::Busy`] instead.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A row lock could not be acquired within the bounded wait.
    ///
    /// Retryable; the operation held no locks when it failed.
    #[error("Operation timed out waiting for a lock")]
    Busy,

    /// The wallet version changed between read and conditional update on
    /// every bounded retry attempt.
    ///
    /// Retryable; nothing was committed.
    #[error("Concurrent modification of wallet state")]
    ConcurrentModification,

    /// Admin token is missing, invalid, or inactive.
    #[error("Invalid admin token")]
    Unauthorized,

    /// The authenticated admin's role does not grant the required capability.
    #[error("Admin role lacks the required capability")]
    Forbidden,

    /// Requested wallet does not exist.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Requested payout does not exist.
    #[error("Payout not found")]
    PayoutNotFound,

    /// Requested transaction does not exist.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Requested order does not exist.
    #[error("Order not found")]
    OrderNotFound,

    /// Amount is zero or negative.
    #[error("Amount must be positive")]
    InvalidAmount,

    /// Supplied currency differs from the wallet's currency.
    #[error("Currency does not match wallet currency")]
    CurrencyMismatch,

    /// Wallet balance cannot cover the requested debit.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// The transaction was already refunded; a refund applies at most once.
    #[error("Transaction already refunded")]
    AlreadyRefunded,

    /// The entity is not in a state that permits this operation.
    ///
    /// The String describes the expected and actual state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The payout state machine forbids this transition.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Request parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AppError {
    /// Whether the caller may retry the same operation unchanged.
    ///
    /// True only for the bounded-contention failures; state conflicts
    /// require a re-fetch and validation failures never succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Busy | AppError::ConcurrentModification)
    }
}

/// Convert sqlx errors at one seam.
///
/// Postgres reports an expired `lock_timeout` as SQLSTATE 55P03
/// (lock_not_available); that is the engine's bounded lock wait firing, so
/// it surfaces as the retryable `Busy` rather than a storage failure.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("55P03") {
                return AppError::Busy;
            }
        }
        AppError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_covers_contention_only() {
        assert!(AppError::Busy.is_retryable());
        assert!(AppError::ConcurrentModification.is_retryable());
        assert!(!AppError::InsufficientFunds.is_retryable());
        assert!(!AppError::AlreadyRefunded.is_retryable());
        assert!(!AppError::InvalidAmount.is_retryable());
        assert!(!AppError::InvalidTransition("x".into()).is_retryable());
    }
}
