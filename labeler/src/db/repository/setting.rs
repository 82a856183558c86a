//! Settings Repository
//!
//! Plain key/value strings. No caching: every call round-trips to the
//! database and the last writer wins.

use super::RepoResult;
use shared::models::{DeviceSettings, Setting, UiConfig};
use sqlx::SqlitePool;
use std::collections::HashMap;

pub async fn get(pool: &SqlitePool, key: &str) -> RepoResult<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Insert or replace
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> RepoResult<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<Setting>> {
    let rows = sqlx::query_as::<_, Setting>("SELECT key, value FROM settings ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn as_map(pool: &SqlitePool) -> RepoResult<HashMap<String, String>> {
    Ok(list(pool)
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect())
}

/// Device settings for one operation
pub async fn load_device_settings(pool: &SqlitePool) -> RepoResult<DeviceSettings> {
    Ok(DeviceSettings::from_map(&as_map(pool).await?))
}

/// Persist every device setting (Options dialog save)
pub async fn save_device_settings(pool: &SqlitePool, settings: &DeviceSettings) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    for (key, value) in settings.to_pairs() {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn load_ui_config(pool: &SqlitePool) -> RepoResult<UiConfig> {
    Ok(UiConfig::from_map(&as_map(pool).await?))
}
