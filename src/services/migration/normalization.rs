//! Normalization plans: rewrite every stored reference that is not already
//! a live canonical key.

use super::plan::{
    count_records, load_store_snapshots, normalization_fingerprint, ActionKind,
    NormalizationPlan, ReferenceAction, SkippedReference, StoreSnapshot,
};
use crate::database::models::ReferenceStore;
use crate::services::identity::IdentityMap;
use crate::types::CanonicalKey;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub fn build_normalization_plan(map: &IdentityMap, snapshots: &[StoreSnapshot]) -> NormalizationPlan {
    let mut actions = Vec::new();
    let mut skipped = Vec::new();

    for snapshot in snapshots {
        plan_store(map, snapshot, &mut actions, &mut skipped);
    }

    let mut plan = NormalizationPlan {
        actions,
        skipped,
        store_counts: count_records(snapshots),
        fingerprint: String::new(),
        created_at: Utc::now(),
    };
    plan.fingerprint = normalization_fingerprint(&plan);

    log::info!(
        "Normalization plan: {} actions, {} skipped references",
        plan.actions.len(),
        plan.skipped.len()
    );
    plan
}

pub async fn plan_normalization_from_store(
    pool: &SqlitePool,
    map: &IdentityMap,
) -> Result<NormalizationPlan, sqlx::Error> {
    let snapshots = load_store_snapshots(pool).await?;
    Ok(build_normalization_plan(map, &snapshots))
}

struct Holder {
    record_id: i64,
    is_optional: bool,
}

fn plan_store(
    map: &IdentityMap,
    snapshot: &StoreSnapshot,
    actions: &mut Vec<ReferenceAction>,
    skipped: &mut Vec<SkippedReference>,
) {
    let store = snapshot.store;
    let mut resolved: Vec<(usize, CanonicalKey)> = Vec::with_capacity(snapshot.records.len());

    for (index, record) in snapshot.records.iter().enumerate() {
        match map.normalize_raw(&record.ingredient_key) {
            Ok(key) => resolved.push((index, key)),
            Err(error) => {
                log::warn!(
                    "{} record {} ({}): {}",
                    store,
                    record.id,
                    record.owner_id,
                    error
                );
                skipped.push(SkippedReference {
                    store,
                    record_id: record.id,
                    owner_id: record.owner_id.clone(),
                    raw_key: record.ingredient_key.clone(),
                    reason: error.to_string(),
                    error_kind: error.kind().to_string(),
                });
            }
        }
    }

    // Records already holding the exact canonical key are the preferred holders.
    let mut holders: HashMap<(&str, &CanonicalKey), Holder> = HashMap::new();
    for (index, key) in &resolved {
        let record = &snapshot.records[*index];
        if record.ingredient_key == key.as_str() {
            holders
                .entry((record.owner_id.as_str(), key))
                .or_insert(Holder {
                    record_id: record.id,
                    is_optional: record.is_optional,
                });
        }
    }

    for (index, key) in &resolved {
        let record = &snapshot.records[*index];
        if record.ingredient_key == key.as_str() {
            continue;
        }

        let kind = match holders.get_mut(&(record.owner_id.as_str(), key)) {
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
                    (record.owner_id.as_str(), key),
                    Holder {
                        record_id: record.id,
                        is_optional: record.is_optional,
                    },
                );
                ActionKind::Rewrite
            }
        };

        let display_name = map
            .get(key)
            .map(|summary| summary.display_name.clone())
            .unwrap_or_default();

        actions.push(ReferenceAction {
            store,
            record_id: record.id,
            owner_id: record.owner_id.clone(),
            from_key: record.ingredient_key.clone(),
            to_key: key.clone(),
            to_display_name: display_name,
            kind,
        });
    }
}

#[cfg(test)]
#[path = "tests/normalization_tests.rs"]
mod tests;
