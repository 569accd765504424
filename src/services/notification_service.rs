//! Notification outbox and signed delivery.
//!
//! Engines enqueue user notifications inside their financial transaction;
//! the dispatcher binary delivers them out-of-band. A delivery failure is
//! recorded on the row and retried on the next poll; it never propagates
//! to the financial operation that caused the notification.

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::notification::{NotificationEnvelope, OutboxNotification};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Delivery attempts after which a row is left for manual inspection.
const MAX_DELIVERY_ATTEMPTS: i32 = 8;

/// Rows fetched per dispatch poll.
const DISPATCH_BATCH_SIZE: i64 = 50;

/// Queue a notification inside the caller's transaction.
///
/// Committing the financial transaction makes the row visible to the
/// dispatcher; rolling back discards it with the rest of the mutation.
pub(crate) async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    event_type: &str,
    payload: Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO notification_outbox (user_id, event_type, payload)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(event_type)
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Deliver queued notifications to the configured sink.
///
/// # Process
///
/// 1. Load a batch of undelivered rows below the attempt limit
/// 2. POST each to the sink with an HMAC signature header
/// 3. Mark delivered rows; record the error and bump attempts on failures
///
/// # Error Handling
///
/// Individual delivery failures are logged and recorded on the row; they
/// never fail the batch. With no sink configured the queue is left alone.
///
/// # Returns
///
/// The number of notifications delivered in this poll.
pub async fn dispatch_pending(
    pool: &DbPool,
    client: &reqwest::Client,
    config: &Config,
) -> Result<u32, AppError> {
    let Some(notify_url) = config.notify_url.as_deref() else {
        tracing::debug!("no notification sink configured, leaving outbox queued");
        return Ok(0);
    };

    let pending = sqlx::query_as::<_, OutboxNotification>(
        r#"
        SELECT * FROM notification_outbox
        WHERE delivered_at IS NULL AND attempts < $1
        ORDER BY created_at
        LIMIT $2
        "#,
    )
    .bind(MAX_DELIVERY_ATTEMPTS)
    .bind(DISPATCH_BATCH_SIZE)
    .fetch_all(pool)
    .await?;

    let mut delivered = 0;
    for row in &pending {
        match send_notification(client, notify_url, config.notify_secret.as_deref(), row).await {
            Ok(()) => {
                sqlx::query(
                    "UPDATE notification_outbox SET delivered_at = NOW(), attempts = attempts + 1 WHERE id = $1",
                )
                .bind(row.id)
                .execute(pool)
                .await?;
                delivered += 1;
            }
            Err(e) => {
                tracing::error!(notification_id = %row.id, error = %e, "notification delivery failed");
                sqlx::query(
                    "UPDATE notification_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
                )
                .bind(row.id)
                .bind(&e)
                .execute(pool)
                .await?;
            }
        }
    }

    Ok(delivered)
}

/// Send a single notification with an HMAC signature.
///
/// Errors come back as plain strings, recorded verbatim in the row's
/// `last_error` column.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Notification-Signature: sha256=<hex>` (when a secret is configured)
/// - `X-Notification-Event-Id: <uuid>`
async fn send_notification(
    client: &reqwest::Client,
    notify_url: &str,
    secret: Option<&str>,
    row: &OutboxNotification,
) -> Result<(), String> {
    let envelope = NotificationEnvelope::from(row);
    let body =
        serde_json::to_string(&envelope).map_err(|e| format!("failed to serialize payload: {e}"))?;

    let mut request = client
        .post(notify_url)
        .header("Content-Type", "application/json")
        .header("X-Notification-Event-Id", row.id.to_string());

    if let Some(secret) = secret {
        request = request.header("X-Notification-Signature", sign_payload(secret, &body));
    }

    let response = request
        .body(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!("sink returned {}", response.status()));
    }

    Ok(())
}

/// Generate the HMAC-SHA256 signature for a notification body.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
///
/// Receivers recompute HMAC-SHA256(secret, request_body) and compare with
/// a constant-time comparison.
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}

/// Validate the notification sink URL.
///
/// # Rules
///
/// - Must be a valid URL of at most 2048 characters
/// - Must be HTTPS (HTTP is allowed for loopback hosts during development)
pub fn validate_notify_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidRequest(
            "notify URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidRequest("invalid notify URL".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            if matches!(
                parsed.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0")
            ) {
                Ok(())
            } else {
                Err(AppError::InvalidRequest(
                    "HTTP is only allowed for localhost sinks".to_string(),
                ))
            }
        }
        _ => Err(AppError::InvalidRequest(
            "notify URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
