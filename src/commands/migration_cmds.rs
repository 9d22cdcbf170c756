use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::database::migration_run_repo;
use crate::database::models::MigrationRunRow;
use crate::services::identity::load_identity_map;
use crate::services::migration::{
    execute, plan_normalization_from_store, MigrationOptions, MigrationPlan, MigrationReport,
};
use crate::types::errors::{CommandError, CommandResult};

/// Where the plan for a run comes from.
#[derive(Debug, Clone)]
pub enum PlanSource {
    /// A plan file written by `plan-merge` or an earlier `--normalize` run.
    File(PathBuf),
    /// Build a normalization plan from the current stores.
    Normalize { save_to: Option<PathBuf> },
}

pub fn read_plan(path: &Path) -> CommandResult<MigrationPlan> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CommandError::NotFound(format!("Plan file {}", path.display()))
        } else {
            CommandError::Io(format!("{}: {e}", path.display()))
        }
    })?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_plan(path: &Path, plan: &MigrationPlan) -> CommandResult<()> {
    let json = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, json)?;
    log::info!(
        "Wrote {} plan {} to {}",
        plan.kind(),
        plan.fingerprint(),
        path.display()
    );
    Ok(())
}

async fn load_plan(pool: &SqlitePool, source: &PlanSource) -> CommandResult<MigrationPlan> {
    match source {
        PlanSource::File(path) => read_plan(path),
        PlanSource::Normalize { save_to } => {
            let map = load_identity_map(pool).await?;
            let plan = MigrationPlan::Normalization(plan_normalization_from_store(pool, &map).await?);
            if let Some(path) = save_to {
                write_plan(path, &plan)?;
            }
            Ok(plan)
        }
    }
}

/// Run one migration. Dry run unless `options.mode` says otherwise.
/// Concurrent writers are caught by the runner's count checks.
pub async fn run_migration_cmd(
    pool: &SqlitePool,
    source: PlanSource,
    options: MigrationOptions,
) -> CommandResult<MigrationReport> {
    let plan = load_plan(pool, &source).await?;
    let report = execute(pool, &plan, &options).await?;

    log::info!(
        "Migration {} finished: status={} processed={} updated={} collapsed={} skipped={} failed={}",
        report.run_id,
        report.status(),
        report.counts.processed,
        report.counts.updated,
        report.counts.collapsed,
        report.counts.skipped,
        report.counts.failed
    );
    Ok(report)
}

pub async fn migration_history_cmd(
    pool: &SqlitePool,
    limit: i64,
) -> CommandResult<Vec<MigrationRunRow>> {
    if limit < 1 {
        return Err(CommandError::Validation(
            "History limit must be at least 1".to_string(),
        ));
    }
    Ok(migration_run_repo::get_recent_runs(pool, limit).await?)
}
