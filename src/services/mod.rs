//! Business logic services.
//!
//! Services contain the engine's core logic, one module per contract.
//! They own database transactions, validation, and the pairing of every
//! admin mutation with its audit record and outbox notification.

pub mod audit_service;
pub mod escrow_service;
pub mod notification_service;
pub mod payout_service;
pub mod refund_service;
pub mod wallet_service;
