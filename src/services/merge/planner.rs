use super::suggestion::suggest_survivor;
use super::MergeError;
use crate::database::models::ReferenceStore;
use crate::services::identity::{IdentityMap, IngredientSummary};
use crate::services::migration::plan::{
    count_records, load_store_snapshots, merge_fingerprint, ActionKind, MergePlan,
    ReferenceAction, StoreSnapshot,
};
use crate::types::CanonicalKey;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Names (or any identifier shape) believed to denote one ingredient.
    pub candidates: Vec<String>,
    /// Explicit survivor; required whenever two live rows match.
    pub survivor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum MergeOutcome {
    /// All candidates already denote one live row.
    AlreadyMerged { ingredient: IngredientSummary },
    Planned(Box<MergePlan>),
}

/// Plan a two-way merge against snapshots of the dependent stores.
pub fn plan_merge(
    map: &IdentityMap,
    request: &MergeRequest,
    snapshots: &[StoreSnapshot],
) -> Result<MergeOutcome, MergeError> {
    let keys = resolve_candidate_keys(map, &request.candidates)?;
    let candidates: Vec<IngredientSummary> = keys
        .iter()
        .filter_map(|key| map.get(key).cloned())
        .collect();

    match candidates.as_slice() {
        [] => Err(MergeError::EmptyCandidates),
        [only] => {
            log::info!(
                "Merge candidates all resolve to '{}'; nothing to merge",
                only.display_name
            );
            Ok(MergeOutcome::AlreadyMerged {
                ingredient: only.clone(),
            })
        }
        [a, b] => {
            let Some(raw_survivor) = request.survivor.as_deref() else {
                return Err(MergeError::SurvivorRequired {
                    suggestion: Some(suggest_survivor(a, b)),
                    candidates: candidates.clone(),
                });
            };
            let survivor_key = map.normalize_raw(raw_survivor).map_err(|_| {
                MergeError::SurvivorNotCandidate {
                    survivor: raw_survivor.to_string(),
                }
            })?;
            let (survivor, retiring) = if survivor_key == a.key {
                (a, b)
            } else if survivor_key == b.key {
                (b, a)
            } else {
                return Err(MergeError::SurvivorNotCandidate {
                    survivor: raw_survivor.to_string(),
                });
            };

            let plan = build_plan(map, survivor, retiring, snapshots);
            log::info!(
                "Planned merge of '{}' into '{}': {} actions ({} collapses)",
                retiring.display_name,
                survivor.display_name,
                plan.actions.len(),
                plan.actions.iter().filter(|a| a.is_collapse()).count()
            );
            Ok(MergeOutcome::Planned(Box::new(plan)))
        }
        _ => Err(MergeError::AmbiguousDuplicate { candidates }),
    }
}

/// Snapshot the stores and plan the merge.
pub async fn plan_merge_from_store(
    pool: &SqlitePool,
    map: &IdentityMap,
    request: &MergeRequest,
) -> Result<MergeOutcome, MergeError> {
    let snapshots = load_store_snapshots(pool).await?;
    plan_merge(map, request, &snapshots)
}

/// Distinct live keys in first-seen order.
fn resolve_candidate_keys(
    map: &IdentityMap,
    candidates: &[String],
) -> Result<Vec<CanonicalKey>, MergeError> {
    if candidates.iter().all(|c| c.trim().is_empty()) {
        return Err(MergeError::EmptyCandidates);
    }

    let mut keys: Vec<CanonicalKey> = Vec::new();
    for name in candidates.iter().filter(|c| !c.trim().is_empty()) {
        let resolved =
            map.resolve_candidates(name)
                .map_err(|source| MergeError::UnresolvedCandidate {
                    name: name.clone(),
                    source,
                })?;
        for key in resolved {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    Ok(keys)
}

fn build_plan(
    map: &IdentityMap,
    survivor: &IngredientSummary,
    retiring: &IngredientSummary,
    snapshots: &[StoreSnapshot],
) -> MergePlan {
    let mut actions = Vec::new();

    for snapshot in snapshots {
        actions.extend(plan_store(map, snapshot, survivor, retiring));
    }

    let mut plan = MergePlan {
        survivor: survivor.clone(),
        retiring: retiring.clone(),
        actions,
        store_counts: count_records(snapshots),
        fingerprint: String::new(),
        created_at: Utc::now(),
    };
    plan.fingerprint = merge_fingerprint(&plan);
    plan
}

/// Per owner, the record that will hold the survivor key after the merge.
struct Holder {
    record_id: i64,
    is_optional: bool,
}

fn plan_store(
    map: &IdentityMap,
    snapshot: &StoreSnapshot,
    survivor: &IngredientSummary,
    retiring: &IngredientSummary,
) -> Vec<ReferenceAction> {
    let store = snapshot.store;
    let mut holders: HashMap<&str, Holder> = HashMap::new();

    // Records already resolving to the survivor keep their place.
    for record in &snapshot.records {
        if map.normalize_raw(&record.ingredient_key).ok().as_ref() == Some(&survivor.key) {
            holders
                .entry(record.owner_id.as_str())
                .or_insert(Holder {
                    record_id: record.id,
                    is_optional: record.is_optional,
                });
        }
    }

    let mut actions = Vec::new();
    for record in &snapshot.records {
        if map.normalize_raw(&record.ingredient_key).ok().as_ref() != Some(&retiring.key) {
            continue;
        }

        let kind = match holders.get_mut(record.owner_id.as_str()) {
            Some(holder) => {
                let promote_required = store == ReferenceStore::RecipeIngredients
                    && holder.is_optional
                    && !record.is_optional;
                if promote_required {
                    holder.is_optional = false;
                }
                ActionKind::Collapse {
                    keep_record_id: holder.record_id,
                    promote_required,
                }
            }
            None => {
                holders.insert(
                    record.owner_id.as_str(),
                    Holder {
                        record_id: record.id,
                        is_optional: record.is_optional,
                    },
                );
                ActionKind::Rewrite
            }
        };

        actions.push(ReferenceAction {
            store,
            record_id: record.id,
            owner_id: record.owner_id.clone(),
            from_key: record.ingredient_key.clone(),
            to_key: survivor.key.clone(),
            to_display_name: survivor.display_name.clone(),
            kind,
        });
    }
    actions
}

#[cfg(test)]
#[path = "tests/planner_tests.rs"]
mod tests;
