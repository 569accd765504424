//! Notification Dispatcher - Worker Entry Point
//!
//! Financial operations enqueue user notifications into a transactional
//! outbox; this worker drains it. Delivery is deliberately outside the
//! financial transactions, so a slow or failing sink can never roll back
//! or delay a balance mutation.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Validate the notification sink URL, if configured
//! 3. Create database connection pool
//! 4. Run database migrations
//! 5. Poll the outbox on the configured interval

use creator_finops::{config::Config, db, services::notification_service};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    if let Some(url) = &config.notify_url {
        notification_service::validate_notify_url(url)
            .map_err(|e| anyhow::anyhow!("invalid NOTIFY_URL: {e}"))?;
    } else {
        tracing::warn!("NOTIFY_URL not set; outbox rows will queue without delivery");
    }

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Bounded per-request timeout so one slow sink call cannot stall the poll loop
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(config.dispatch_interval_secs));
    tracing::info!(
        interval_secs = config.dispatch_interval_secs,
        "Outbox dispatcher running"
    );

    loop {
        ticker.tick().await;
        match notification_service::dispatch_pending(&pool, &client, &config).await {
            Ok(0) => {}
            Ok(delivered) => tracing::info!(delivered, "notifications delivered"),
            Err(e) => tracing::error!("outbox dispatch failed: {e}"),
        }
    }
}
