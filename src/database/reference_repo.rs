//! Uniform access to every store that references ingredients.
//!
//! Table and column names come from [`ReferenceStore`] and are never taken
//! from input, so the formatted SQL below is closed over a fixed set.

use super::models::{ReferenceStore, StoredReference};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

fn optional_expr(store: ReferenceStore) -> &'static str {
    match store {
        ReferenceStore::RecipeIngredients => "is_optional",
        _ => "0",
    }
}

/// Every reference in `store`, ordered by record id.
pub async fn list_references(
    pool: &SqlitePool,
    store: ReferenceStore,
) -> Result<Vec<StoredReference>, sqlx::Error> {
    let sql = format!(
        "SELECT id, {owner} AS owner_id, ingredient_key, {optional} AS is_optional FROM {table} ORDER BY id",
        owner = store.owner_column(),
        optional = optional_expr(store),
        table = store.table(),
    );
    sqlx::query_as::<_, StoredReference>(&sql)
        .fetch_all(pool)
        .await
}

pub async fn count_references(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {}", store.table());
    sqlx::query_scalar(&sql).fetch_one(conn).await
}

/// Find another record of the same owner that already holds `ingredient_key`.
pub async fn find_owner_record(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    owner_id: &str,
    ingredient_key: &str,
    exclude_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!(
        "SELECT id FROM {table} WHERE {owner} = ? AND ingredient_key = ? AND id != ? ORDER BY id LIMIT 1",
        table = store.table(),
        owner = store.owner_column(),
    );
    sqlx::query_scalar(&sql)
        .bind(owner_id)
        .bind(ingredient_key)
        .bind(exclude_id)
        .fetch_optional(conn)
        .await
}

/// Whether `record_id` still exists, belongs to `owner_id` and holds `ingredient_key`.
pub async fn record_holds_key(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    record_id: i64,
    owner_id: &str,
    ingredient_key: &str,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE id = ? AND {owner} = ? AND ingredient_key = ?",
        table = store.table(),
        owner = store.owner_column(),
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(record_id)
        .bind(owner_id)
        .bind(ingredient_key)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Point one record at a new key. Guarded by the old key so a repeated
/// call is a no-op.
pub async fn rewrite_reference(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    record_id: i64,
    from_key: &str,
    to_key: &str,
    cached_name: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = if store.has_cached_name() {
        let sql = format!(
            "UPDATE {} SET ingredient_key = ?, cached_name = COALESCE(?, cached_name) WHERE id = ? AND ingredient_key = ?",
            store.table()
        );
        sqlx::query(&sql)
            .bind(to_key)
            .bind(cached_name)
            .bind(record_id)
            .bind(from_key)
            .execute(conn)
            .await?
    } else {
        let sql = format!(
            "UPDATE {} SET ingredient_key = ? WHERE id = ? AND ingredient_key = ?",
            store.table()
        );
        sqlx::query(&sql)
            .bind(to_key)
            .bind(record_id)
            .bind(from_key)
            .execute(conn)
            .await?
    };
    Ok(result.rows_affected())
}

/// Delete one record, guarded by the key it is expected to hold.
pub async fn delete_reference(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    record_id: i64,
    expected_key: &str,
) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "DELETE FROM {} WHERE id = ? AND ingredient_key = ?",
        store.table()
    );
    let result = sqlx::query(&sql)
        .bind(record_id)
        .bind(expected_key)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Mark a recipe requirement as required.
pub async fn mark_requirement_required(
    conn: &mut SqliteConnection,
    record_id: i64,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE recipe_ingredients SET is_optional = 0 WHERE id = ? AND is_optional = 1")
            .bind(record_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

/// Current key held by each of `record_ids`; ids with no row are absent.
pub async fn get_keys_for_ids(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    record_ids: &[i64],
) -> Result<Vec<(i64, String)>, sqlx::Error> {
    if record_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
        "SELECT id, ingredient_key FROM {} WHERE id IN (",
        store.table()
    ));
    let mut sep = qb.separated(", ");
    for id in record_ids {
        sep.push_bind(*id);
    }
    qb.push(") ORDER BY id");

    qb.build_query_as().fetch_all(conn).await
}

/// Insert an ownership record; an existing (user, key) pair is left as is.
pub async fn insert_ownership(
    conn: &mut SqliteConnection,
    store: ReferenceStore,
    user_id: &str,
    ingredient_key: &str,
    cached_name: Option<&str>,
) -> Result<u64, sqlx::Error> {
    if !store.has_cached_name() {
        return Err(sqlx::Error::Protocol(format!(
            "{store} is not an ownership store"
        )));
    }
    let sql = format!(
        "INSERT OR IGNORE INTO {} (user_id, ingredient_key, cached_name) VALUES (?, ?, ?)",
        store.table()
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(ingredient_key)
        .bind(cached_name)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Raw keys held by one user in an ownership store.
pub async fn get_user_keys(
    pool: &SqlitePool,
    store: ReferenceStore,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let sql = format!(
        "SELECT ingredient_key FROM {} WHERE user_id = ? ORDER BY id",
        store.table()
    );
    sqlx::query_scalar(&sql).bind(user_id).fetch_all(pool).await
}

#[cfg(test)]
#[path = "tests/reference_repo_test.rs"]
mod tests;
