use super::models::IngredientRow;
use sqlx::{SqliteConnection, SqlitePool};

/// Full catalog snapshot, in a stable order.
pub async fn get_all_ingredients(pool: &SqlitePool) -> Result<Vec<IngredientRow>, sqlx::Error> {
    sqlx::query_as::<_, IngredientRow>(
        "SELECT canonical_key, display_name, normalized_name, legacy_key, category, is_staple
         FROM ingredients
         ORDER BY display_name COLLATE NOCASE, canonical_key",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_ingredient(
    conn: &mut SqliteConnection,
    canonical_key: &str,
) -> Result<Option<IngredientRow>, sqlx::Error> {
    sqlx::query_as::<_, IngredientRow>(
        "SELECT canonical_key, display_name, normalized_name, legacy_key, category, is_staple
         FROM ingredients WHERE canonical_key = ?",
    )
    .bind(canonical_key)
    .fetch_optional(conn)
    .await
}

/// Upsert one catalog row keyed by canonical key.
pub async fn upsert_ingredient(
    conn: &mut SqliteConnection,
    row: &IngredientRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ingredients (canonical_key, display_name, normalized_name, legacy_key, category, is_staple)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(canonical_key) DO UPDATE SET
            display_name = excluded.display_name,
            normalized_name = excluded.normalized_name,
            legacy_key = excluded.legacy_key,
            category = excluded.category,
            is_staple = excluded.is_staple",
    )
    .bind(&row.canonical_key)
    .bind(&row.display_name)
    .bind(&row.normalized_name)
    .bind(row.legacy_key)
    .bind(&row.category)
    .bind(row.is_staple)
    .execute(conn)
    .await?;
    Ok(())
}

/// All retired keys with the survivor they were merged into.
pub async fn get_retired_keys(pool: &SqlitePool) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as("SELECT canonical_key, survivor_key FROM retired_ingredient_keys")
        .fetch_all(pool)
        .await
}

pub async fn is_key_retired(
    conn: &mut SqliteConnection,
    canonical_key: &str,
) -> Result<bool, sqlx::Error> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM retired_ingredient_keys WHERE canonical_key = ?")
            .bind(canonical_key)
            .fetch_optional(conn)
            .await?;
    Ok(existing.is_some())
}

/// Record the retirement and delete the live row. Safe to repeat: a second
/// call finds nothing to delete and leaves the first record untouched.
///
/// Returns the number of live rows deleted.
pub async fn retire_ingredient(
    conn: &mut SqliteConnection,
    canonical_key: &str,
    survivor_key: &str,
    display_name: &str,
) -> Result<u64, sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO retired_ingredient_keys (canonical_key, survivor_key, display_name)
         VALUES (?, ?, ?)",
    )
    .bind(canonical_key)
    .bind(survivor_key)
    .bind(display_name)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query("DELETE FROM ingredients WHERE canonical_key = ?")
        .bind(canonical_key)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_ingredients(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
#[path = "tests/ingredient_repo_test.rs"]
mod tests;
