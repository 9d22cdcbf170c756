use super::models::MigrationRunRow;
use sqlx::SqlitePool;

pub async fn insert_run(
    pool: &SqlitePool,
    id: &str,
    plan_kind: &str,
    plan_fingerprint: &str,
    mode: &str,
    started_at: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO migration_runs (id, plan_kind, plan_fingerprint, mode, status, started_at)
         VALUES (?, ?, ?, ?, 'running', ?)",
    )
    .bind(id)
    .bind(plan_kind)
    .bind(plan_fingerprint)
    .bind(mode)
    .bind(started_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn finish_run(
    pool: &SqlitePool,
    id: &str,
    status: &str,
    summary_json: &str,
    finished_at: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE migration_runs SET status = ?, summary = ?, finished_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(summary_json)
    .bind(finished_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_recent_runs(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<MigrationRunRow>, sqlx::Error> {
    sqlx::query_as::<_, MigrationRunRow>(
        "SELECT id, plan_kind, plan_fingerprint, mode, status, summary, started_at, finished_at
         FROM migration_runs ORDER BY started_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
#[path = "tests/migration_run_repo_test.rs"]
mod tests;
