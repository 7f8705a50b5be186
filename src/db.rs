//! # Database Module
//!
//! SQLite persistence for two tables:
//!
//! - `api_flight_responses`: raw flight API payloads, one row per distinct
//!   query. Used as the timeout fallback and for audit, never to short-circuit
//!   a fresh search.
//! - `search_history`: per-user log of completed searches.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::callback_codec::ONE_WAY;
use crate::errors::TravelError;

/// Default number of history rows shown to a user
pub const DEFAULT_HISTORY_LIMIT: i64 = 5;

/// A raw flight API payload as stored
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CachedApiResponse {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub depart_date: String,
    pub return_date: Option<String>,
    pub response_json: String,
    pub created_at: DateTime<Utc>,
    pub search_hash: String,
}

/// One completed search in a user's history
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub departure: String,
    pub destination: String,
    pub date_range: String,
    pub timestamp: DateTime<Utc>,
}

/// Open a connection pool, creating the database file and its directory if needed
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {database_url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    if !database_url.contains(":memory:") {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to open SQLite database")?;
    Ok(pool)
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS search_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            departure TEXT NOT NULL,
            destination TEXT NOT NULL,
            date_range TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create search_history table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_search_history_user
         ON search_history (user_id, timestamp)",
    )
    .execute(pool)
    .await
    .context("Failed to create search_history index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS api_flight_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            depart_date TEXT NOT NULL,
            return_date TEXT,
            response_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            search_hash TEXT NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create api_flight_responses table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Deterministic key for a query: 64-bit FNV-1a over the joined parameters, as hex.
///
/// `std::hash` is not used because its output may change between Rust releases,
/// and the hash is persisted.
pub fn search_hash(origin: &str, destination: &str, depart_date: &str, return_date: Option<&str>) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let key = format!(
        "{origin}|{destination}|{depart_date}|{}",
        return_date.unwrap_or(ONE_WAY)
    );
    let hash = key.bytes().fold(FNV_OFFSET, |acc, byte| {
        (acc ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("{hash:016x}")
}

/// Store of raw flight API responses
#[derive(Debug, Clone)]
pub struct ResponseStore {
    pool: SqlitePool,
}

impl ResponseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a payload. A repeated identical query replaces its previous row,
    /// and the replacement gets a fresh row id so it becomes the latest.
    pub async fn put(
        &self,
        origin: &str,
        destination: &str,
        depart_date: &str,
        return_date: Option<&str>,
        raw_response: &str,
    ) -> Result<String, TravelError> {
        let hash = search_hash(origin, destination, depart_date, return_date);

        sqlx::query(
            "INSERT OR REPLACE INTO api_flight_responses
                (origin, destination, depart_date, return_date, response_json, created_at, search_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(origin)
        .bind(destination)
        .bind(depart_date)
        .bind(return_date)
        .bind(raw_response)
        .bind(Utc::now())
        .bind(&hash)
        .execute(&self.pool)
        .await?;

        debug!(search_hash = %hash, origin, destination, "Stored flight API response");
        Ok(hash)
    }

    /// The most recently written payload, whatever query produced it
    pub async fn get_latest(&self) -> Result<Option<CachedApiResponse>, TravelError> {
        let row = sqlx::query_as::<_, CachedApiResponse>(
            "SELECT id, origin, destination, depart_date, return_date, response_json, created_at, search_hash
             FROM api_flight_responses
             ORDER BY id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Look up the stored payload for one query
    pub async fn get_by_hash(&self, hash: &str) -> Result<Option<CachedApiResponse>, TravelError> {
        let row = sqlx::query_as::<_, CachedApiResponse>(
            "SELECT id, origin, destination, depart_date, return_date, response_json, created_at, search_hash
             FROM api_flight_responses
             WHERE search_hash = ?1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Display string for a searched date range
pub fn format_date_range(depart_date: &str, return_date: Option<&str>) -> String {
    match return_date {
        Some(ret) if !ret.is_empty() => format!("{depart_date} → {ret}"),
        _ => depart_date.to_string(),
    }
}

/// Record a completed search
pub async fn add_search(
    pool: &SqlitePool,
    user_id: i64,
    departure: &str,
    destination: &str,
    depart_date: &str,
    return_date: Option<&str>,
) -> Result<i64> {
    info!(user_id, "Recording search in history");

    let result = sqlx::query(
        "INSERT INTO search_history (user_id, departure, destination, date_range, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(user_id)
    .bind(departure)
    .bind(destination)
    .bind(format_date_range(depart_date, return_date))
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert search history entry")?;

    Ok(result.last_insert_rowid())
}

/// Most recent searches for a user, newest first
pub async fn get_history(pool: &SqlitePool, user_id: i64, limit: i64) -> Result<Vec<SearchHistoryEntry>> {
    let entries = sqlx::query_as::<_, SearchHistoryEntry>(
        "SELECT id, user_id, departure, destination, date_range, timestamp
         FROM search_history
         WHERE user_id = ?1
         ORDER BY timestamp DESC, id DESC
         LIMIT ?2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to read search history")?;

    Ok(entries)
}

/// Delete every history row for a user, returning how many were removed
pub async fn clear_history(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_history WHERE user_id = ?1")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to clear search history")?;

    info!(user_id, deleted = result.rows_affected(), "Cleared search history");
    Ok(result.rows_affected())
}
