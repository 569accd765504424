//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Audit trail record
pub mod audit;
/// Notification outbox row
pub mod notification;
/// Marketplace order with escrowed funds
pub mod order;
/// Payout request and its lifecycle states
pub mod payout;
/// Purchase/subscription transaction
pub mod transaction;
/// Wallet and its ledger entries
pub mod wallet;
