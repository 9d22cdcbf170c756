//! Plan documents handed to the migration runner.
//!
//! A plan is a closed list of per-record actions plus the store counts seen
//! at planning time. Plans are serialized to JSON between `plan-merge` and
//! `run-migration`, so every plan carries a BLAKE3 fingerprint over its
//! content; a plan whose fingerprint does not match is refused.

use crate::database::models::{ReferenceStore, StoredReference};
use crate::database::reference_repo;
use crate::services::identity::IngredientSummary;
use crate::types::CanonicalKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// All references of one store at planning time.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub store: ReferenceStore,
    pub records: Vec<StoredReference>,
}

pub async fn load_store_snapshots(pool: &SqlitePool) -> Result<Vec<StoreSnapshot>, sqlx::Error> {
    let mut snapshots = Vec::with_capacity(ReferenceStore::ALL.len());
    for store in ReferenceStore::ALL {
        let records = reference_repo::list_references(pool, store).await?;
        snapshots.push(StoreSnapshot { store, records });
    }
    Ok(snapshots)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ActionKind {
    /// Point the record at the target key.
    Rewrite,
    /// The owner already holds the target key in `keep_record_id`; remove
    /// this record instead of duplicating it. `promote_required` marks the
    /// kept recipe requirement as required.
    #[serde(rename_all = "camelCase")]
    Collapse {
        keep_record_id: i64,
        promote_required: bool,
    },
}

/// One planned change to one stored reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceAction {
    pub store: ReferenceStore,
    pub record_id: i64,
    pub owner_id: String,
    pub from_key: String,
    pub to_key: CanonicalKey,
    pub to_display_name: String,
    pub kind: ActionKind,
}

impl ReferenceAction {
    pub fn is_collapse(&self) -> bool {
        matches!(self.kind, ActionKind::Collapse { .. })
    }
}

/// A stored reference the plan could not translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedReference {
    pub store: ReferenceStore,
    pub record_id: i64,
    pub owner_id: String,
    pub raw_key: String,
    pub reason: String,
    pub error_kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    pub survivor: IngredientSummary,
    pub retiring: IngredientSummary,
    pub actions: Vec<ReferenceAction>,
    pub store_counts: BTreeMap<ReferenceStore, i64>,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationPlan {
    pub actions: Vec<ReferenceAction>,
    pub skipped: Vec<SkippedReference>,
    pub store_counts: BTreeMap<ReferenceStore, i64>,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "plan")]
pub enum MigrationPlan {
    Merge(MergePlan),
    Normalization(NormalizationPlan),
}

impl MigrationPlan {
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationPlan::Merge(_) => "merge",
            MigrationPlan::Normalization(_) => "normalization",
        }
    }

    pub fn actions(&self) -> &[ReferenceAction] {
        match self {
            MigrationPlan::Merge(plan) => &plan.actions,
            MigrationPlan::Normalization(plan) => &plan.actions,
        }
    }

    pub fn skipped(&self) -> &[SkippedReference] {
        match self {
            MigrationPlan::Merge(_) => &[],
            MigrationPlan::Normalization(plan) => &plan.skipped,
        }
    }

    pub fn store_counts(&self) -> &BTreeMap<ReferenceStore, i64> {
        match self {
            MigrationPlan::Merge(plan) => &plan.store_counts,
            MigrationPlan::Normalization(plan) => &plan.store_counts,
        }
    }

    pub fn fingerprint(&self) -> &str {
        match self {
            MigrationPlan::Merge(plan) => &plan.fingerprint,
            MigrationPlan::Normalization(plan) => &plan.fingerprint,
        }
    }

    /// The (retiring, survivor) pair a merge plan retires on success.
    pub fn retirement(&self) -> Option<(&IngredientSummary, &IngredientSummary)> {
        match self {
            MigrationPlan::Merge(plan) => Some((&plan.retiring, &plan.survivor)),
            MigrationPlan::Normalization(_) => None,
        }
    }

    pub fn planned_collapses(&self, store: ReferenceStore) -> i64 {
        self.actions()
            .iter()
            .filter(|action| action.store == store && action.is_collapse())
            .count() as i64
    }

    /// Recompute the fingerprint and compare it with the stored one.
    pub fn verify_fingerprint(&self) -> bool {
        let expected = match self {
            MigrationPlan::Merge(plan) => merge_fingerprint(plan),
            MigrationPlan::Normalization(plan) => normalization_fingerprint(plan),
        };
        expected == self.fingerprint()
    }
}

pub fn count_records(snapshots: &[StoreSnapshot]) -> BTreeMap<ReferenceStore, i64> {
    snapshots
        .iter()
        .map(|snapshot| (snapshot.store, snapshot.records.len() as i64))
        .collect()
}

fn hash_actions(hasher: &mut blake3::Hasher, actions: &[ReferenceAction]) {
    for action in actions {
        let (tag, keep, promote) = match &action.kind {
            ActionKind::Rewrite => ("rewrite", 0, false),
            ActionKind::Collapse {
                keep_record_id,
                promote_required,
            } => ("collapse", *keep_record_id, *promote_required),
        };
        let line = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}\n",
            action.store, action.record_id, action.owner_id, action.from_key, action.to_key, tag, keep, promote
        );
        hasher.update(line.as_bytes());
    }
}

fn hash_counts(hasher: &mut blake3::Hasher, counts: &BTreeMap<ReferenceStore, i64>) {
    for (store, count) in counts {
        hasher.update(format!("{store}={count}\n").as_bytes());
    }
}

pub fn merge_fingerprint(plan: &MergePlan) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("merge|{}|{}\n", plan.retiring.key, plan.survivor.key).as_bytes());
    hash_counts(&mut hasher, &plan.store_counts);
    hash_actions(&mut hasher, &plan.actions);
    hasher.finalize().to_hex()[..32].to_string()
}

pub fn normalization_fingerprint(plan: &NormalizationPlan) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"normalization\n");
    hash_counts(&mut hasher, &plan.store_counts);
    hash_actions(&mut hasher, &plan.actions);
    for skipped in &plan.skipped {
        hasher.update(format!("skip|{}|{}\n", skipped.store, skipped.record_id).as_bytes());
    }
    hasher.finalize().to_hex()[..32].to_string()
}

#[cfg(test)]
#[path = "tests/plan_tests.rs"]
mod tests;
