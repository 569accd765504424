//! Notification outbox data model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One queued user notification, as stored in `notification_outbox`.
///
/// Rows are inserted inside the financial transaction that caused them, so
/// a committed mutation always has its notification queued and a rolled
/// back one never does. Delivery happens out-of-band and is retried
/// independently; delivery failures never affect the financial operation.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OutboxNotification {
    /// Unique identifier, also used as the delivery event id
    pub id: Uuid,

    /// User the notification is for
    pub user_id: Uuid,

    /// Event name, e.g. `payout.paid`, `refund.issued`, `escrow.released`
    pub event_type: String,

    /// Event-specific body forwarded to the sink
    pub payload: serde_json::Value,

    /// Delivery attempts made so far
    pub attempts: i32,

    /// Error from the most recent failed attempt
    pub last_error: Option<String>,

    /// Set once the sink acknowledged the notification
    pub delivered_at: Option<DateTime<Utc>>,

    /// When the notification was enqueued
    pub created_at: DateTime<Utc>,
}

/// Wire format POSTed to the notification sink.
#[derive(Debug, Serialize)]
pub struct NotificationEnvelope {
    pub id: Uuid,
    pub event_type: String,
    pub user_id: Uuid,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&OutboxNotification> for NotificationEnvelope {
    fn from(row: &OutboxNotification) -> Self {
        Self {
            id: row.id,
            event_type: row.event_type.clone(),
            user_id: row.user_id,
            payload: row.payload.clone(),
            created_at: row.created_at,
        }
    }
}
