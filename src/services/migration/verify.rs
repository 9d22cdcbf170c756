//! Count and content checks at the two verification boundaries.

use super::plan::{MigrationPlan, ReferenceAction};
use crate::database::models::ReferenceStore;
use crate::database::reference_repo;
use crate::services::identity::load_identity_map;
use crate::services::migration::plan::load_store_snapshots;
use crate::types::CanonicalKey;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationBoundary {
    Pre,
    Post,
}

/// One failed check. Any issue flips the run verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub boundary: VerificationBoundary,
    pub store: ReferenceStore,
    pub record_id: Option<i64>,
    pub message: String,
}

pub(super) async fn snapshot_counts(
    pool: &SqlitePool,
    stores: impl IntoIterator<Item = ReferenceStore>,
) -> Result<BTreeMap<ReferenceStore, i64>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut counts = BTreeMap::new();
    for store in stores {
        counts.insert(store, reference_repo::count_references(&mut conn, store).await?);
    }
    Ok(counts)
}

/// The store may have shrunk by at most the plan's own collapses (an
/// earlier, interrupted run of the same plan) and must not have grown.
pub(super) fn check_drift(
    plan: &MigrationPlan,
    current: &BTreeMap<ReferenceStore, i64>,
) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();
    for (store, planned) in plan.store_counts() {
        let floor = planned - plan.planned_collapses(*store);
        let actual = current.get(store).copied().unwrap_or(0);
        if actual < floor || actual > *planned {
            issues.push(ConsistencyIssue {
                boundary: VerificationBoundary::Pre,
                store: *store,
                record_id: None,
                message: format!(
                    "{actual} records, expected between {floor} and {planned} since the plan was built"
                ),
            });
        }
    }
    issues
}

pub(super) fn check_conservation(
    pre: &BTreeMap<ReferenceStore, i64>,
    post: &BTreeMap<ReferenceStore, i64>,
    collapses: &BTreeMap<ReferenceStore, i64>,
) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();
    for (store, before) in pre {
        let removed = collapses.get(store).copied().unwrap_or(0);
        let expected = before - removed;
        let after = post.get(store).copied().unwrap_or(0);
        if after != expected {
            issues.push(ConsistencyIssue {
                boundary: VerificationBoundary::Post,
                store: *store,
                record_id: None,
                message: format!(
                    "{after} records after the run, expected {expected} ({before} before, {removed} collapsed)"
                ),
            });
        }
    }
    issues
}

/// Every record touched by a committed batch holds its target key or is gone.
pub(super) async fn check_applied_records(
    pool: &SqlitePool,
    applied: &[&ReferenceAction],
) -> Result<Vec<ConsistencyIssue>, sqlx::Error> {
    let mut by_store: BTreeMap<ReferenceStore, Vec<&ReferenceAction>> = BTreeMap::new();
    for action in applied {
        by_store.entry(action.store).or_default().push(action);
    }

    let mut conn = pool.acquire().await?;
    let mut issues = Vec::new();
    for (store, actions) in by_store {
        let ids: Vec<i64> = actions.iter().map(|a| a.record_id).collect();
        let current: HashMap<i64, String> =
            reference_repo::get_keys_for_ids(&mut conn, store, &ids)
                .await?
                .into_iter()
                .collect();

        for action in actions {
            if let Some(key) = current.get(&action.record_id) {
                if key != action.to_key.as_str() {
                    issues.push(ConsistencyIssue {
                        boundary: VerificationBoundary::Post,
                        store,
                        record_id: Some(action.record_id),
                        message: format!(
                            "record holds '{key}', expected '{}' or removal",
                            action.to_key
                        ),
                    });
                }
            }
        }
    }
    Ok(issues)
}

/// References that still resolve to `retiring`, re-read from the store.
pub(super) async fn residual_references(
    pool: &SqlitePool,
    retiring: &CanonicalKey,
) -> Result<Vec<(ReferenceStore, i64)>, sqlx::Error> {
    let map = load_identity_map(pool).await?;
    let snapshots = load_store_snapshots(pool).await?;

    let mut residual = Vec::new();
    for snapshot in &snapshots {
        for record in &snapshot.records {
            let holds_retiring = record.ingredient_key == retiring.as_str()
                || map.normalize_raw(&record.ingredient_key).ok().as_ref() == Some(retiring);
            if holds_retiring {
                residual.push((snapshot.store, record.id));
            }
        }
    }
    Ok(residual)
}
