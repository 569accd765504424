//! Financial operations engine for a creator monetization platform.
//!
//! This crate implements the admin-mediated money paths: wallet ledger
//! mutations, payout lifecycle management, transaction refunds, and
//! marketplace escrow release, each backed by an append-only audit trail.
//!
//! # Architecture
//!
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Consistency**: optimistic versioning on wallet rows plus row locks
//!   inside multi-statement database transactions
//! - **Audit**: every admin mutation commits exactly one audit record in
//!   the same transaction as the mutation
//! - **Notifications**: transactional outbox, delivered out-of-band by the
//!   dispatcher binary
//!
//! The HTTP layer lives outside this crate; it calls one library function
//! per operation and maps [`error::AppError`] to its own response format.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
