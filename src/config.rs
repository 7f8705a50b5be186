//! # Configuration Module
//!
//! Environment-driven settings for the bot, the upstream HTTP clients and the
//! weather cache. `.env` is loaded by `main` before [`AppConfig::from_env`].

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://database/history.db";
pub const DEFAULT_CURRENCY: &str = "rub";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Upper bound on offers requested from the price API
pub const DEFAULT_RESULT_LIMIT: u32 = 10;

/// Retry configuration for upstream HTTP calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff ceiling for the given retry (1-based), before jitter
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        self.base_retry_delay_ms
            .saturating_mul(factor)
            .min(self.max_retry_delay_ms)
    }
}

/// Weather cache sizing
#[derive(Debug, Clone)]
pub struct WeatherCacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for WeatherCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub travel_token: String,
    pub weather_key: String,
    pub database_url: String,
    pub currency: String,
    pub http_timeout: Duration,
    pub result_limit: u32,
    pub retry: RetryConfig,
    pub weather_cache: WeatherCacheConfig,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup. Fails listing every missing token.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = ["BOT_TOKEN", "TRAVEL_TOKEN", "WEATHER_KEY"];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| lookup(*key).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!("Missing required environment variables: {}", missing.join(", ")));
        }

        let http_timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("HTTP_TIMEOUT_SECS must be a positive integer: {e}"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be a positive integer"));
        }

        Ok(Self {
            bot_token: lookup("BOT_TOKEN").unwrap_or_default(),
            travel_token: lookup("TRAVEL_TOKEN").unwrap_or_default(),
            weather_key: lookup("WEATHER_KEY").unwrap_or_default(),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            currency: lookup("FLIGHT_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            result_limit: DEFAULT_RESULT_LIMIT,
            retry: RetryConfig::default(),
            weather_cache: WeatherCacheConfig::default(),
        })
    }
}
