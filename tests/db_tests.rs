//! # Database Tests
//!
//! File-backed SQLite checks: the database and its directory are created on
//! first connect, and both tables survive a reconnect.

use anyhow::Result;
use skyfare::db::*;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Result<sqlx::SqlitePool> {
    let path = dir.path().join("nested").join("history.db");
    let url = format!("sqlite://{}", path.display());
    let pool = connect(&url, 2).await?;
    init_database_schema(&pool).await?;
    Ok(pool)
}

#[tokio::test]
async fn test_connect_creates_database_file_and_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let pool = open(&dir).await?;
    assert!(dir.path().join("nested").join("history.db").exists());
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_data_survives_reconnect() -> Result<()> {
    let dir = TempDir::new()?;

    let pool = open(&dir).await?;
    add_search(&pool, 100, "Москва", "Стамбул", "2025-09-01", Some("2025-09-09")).await?;
    let hash = ResponseStore::new(pool.clone())
        .put("MOW", "IST", "2025-09-01", Some("2025-09-09"), r#"{"success":true,"data":[]}"#)
        .await?;
    pool.close().await;

    let pool = open(&dir).await?;
    let history = get_history(&pool, 100, DEFAULT_HISTORY_LIMIT).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].destination, "Стамбул");
    assert_eq!(history[0].date_range, "2025-09-01 → 2025-09-09");

    let store = ResponseStore::new(pool.clone());
    let cached = store.get_by_hash(&hash).await?.expect("stored response should survive");
    assert_eq!(cached.search_hash, search_hash("MOW", "IST", "2025-09-01", Some("2025-09-09")));
    assert_eq!(store.get_latest().await?.map(|row| row.id), Some(cached.id));
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_clear_history_for_unknown_user_is_zero() -> Result<()> {
    let dir = TempDir::new()?;
    let pool = open(&dir).await?;
    assert_eq!(clear_history(&pool, 999).await?, 0);
    pool.close().await;
    Ok(())
}
