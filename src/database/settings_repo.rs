use sqlx::SqlitePool;
use std::collections::HashMap;

// ── KV Settings ─────────────────────────────────────────────

/// Get a single setting value by key.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM engine_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Upsert a single setting (INSERT OR REPLACE).
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR REPLACE INTO engine_settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a setting so the lower configuration layers apply again.
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM engine_settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Fetch all settings as a HashMap.
pub async fn get_all_settings(pool: &SqlitePool) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM engine_settings")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
#[path = "tests/settings_repo_test.rs"]
mod tests;
