//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `NOTIFY_URL` (optional): notification sink endpoint; outbox rows stay
///   queued while unset
/// - `NOTIFY_SECRET` (optional): HMAC key for signing notification payloads
/// - `DISPATCH_INTERVAL_SECS` (optional): outbox poll interval, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub notify_url: Option<String>,

    pub notify_secret: Option<String>,

    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval_secs: u64,
}

/// Default outbox poll interval if DISPATCH_INTERVAL_SECS is not set.
fn default_dispatch_interval() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
