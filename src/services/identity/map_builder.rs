use crate::database::ingredient_repo;
use crate::database::models::IngredientRow;
use crate::types::CanonicalKey;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

use super::normalizer::normalize_name;

/// Catalog facts about one live ingredient, as carried through plans and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientSummary {
    pub key: CanonicalKey,
    pub display_name: String,
    pub normalized_name: String,
    pub legacy_key: Option<i64>,
    pub category: String,
    pub is_staple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    NormalizedName,
    LegacyKey,
}

/// Two or more live rows that collide on a lookup key. Reported for the
/// duplicate merger; neither row wins a lookup until the collision is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatentDuplicate {
    pub kind: DuplicateKind,
    pub value: String,
    pub members: Vec<IngredientSummary>,
}

/// Immutable lookup tables over one catalog snapshot.
///
/// Built once per invocation and passed by reference to every component
/// that resolves identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    pub(super) live: HashMap<CanonicalKey, IngredientSummary>,
    pub(super) catalog_order: Vec<CanonicalKey>,
    pub(super) legacy_to_canonical: HashMap<i64, CanonicalKey>,
    pub(super) name_to_canonical: HashMap<String, CanonicalKey>,
    pub(super) rows_by_name: HashMap<String, Vec<CanonicalKey>>,
    pub(super) rows_by_legacy: HashMap<i64, Vec<CanonicalKey>>,
    pub(super) retired: HashMap<CanonicalKey, CanonicalKey>,
    pub(super) latent_duplicates: Vec<LatentDuplicate>,
    pub(super) malformed_rows: Vec<String>,
}

impl IdentityMap {
    /// Build both lookup maps in one pass over the catalog.
    ///
    /// `retired` pairs are `(retired key, survivor key)` and only feed the
    /// orphaned-key hint.
    pub fn build(rows: &[IngredientRow], retired: &[(String, String)]) -> Self {
        let mut map = IdentityMap::default();

        for row in rows {
            let Some(key) = CanonicalKey::parse(&row.canonical_key) else {
                log::warn!(
                    "Catalog row '{}' has a malformed canonical key '{}'; skipped",
                    row.display_name,
                    row.canonical_key
                );
                map.malformed_rows.push(row.canonical_key.clone());
                continue;
            };
            if map.live.contains_key(&key) {
                continue;
            }

            let normalized = normalize_name(&row.display_name);
            let summary = IngredientSummary {
                key: key.clone(),
                display_name: row.display_name.clone(),
                normalized_name: normalized.clone(),
                legacy_key: row.legacy_key,
                category: row.category.clone(),
                is_staple: row.is_staple,
            };

            if !normalized.is_empty() {
                map.rows_by_name
                    .entry(normalized)
                    .or_default()
                    .push(key.clone());
            }
            if let Some(legacy) = row.legacy_key {
                map.rows_by_legacy.entry(legacy).or_default().push(key.clone());
            }
            map.catalog_order.push(key.clone());
            map.live.insert(key, summary);
        }

        // Only unambiguous entries make it into the lookup maps.
        for (name, keys) in &map.rows_by_name {
            if let [only] = keys.as_slice() {
                map.name_to_canonical.insert(name.clone(), only.clone());
            }
        }
        for (legacy, keys) in &map.rows_by_legacy {
            if let [only] = keys.as_slice() {
                map.legacy_to_canonical.insert(*legacy, only.clone());
            }
        }

        map.latent_duplicates = map.collect_latent_duplicates();
        for duplicate in &map.latent_duplicates {
            log::warn!(
                "Latent duplicate ({:?} = '{}'): {} live rows",
                duplicate.kind,
                duplicate.value,
                duplicate.members.len()
            );
        }

        for (retired_key, survivor_key) in retired {
            if let (Some(retired_key), Some(survivor_key)) = (
                CanonicalKey::parse(retired_key),
                CanonicalKey::parse(survivor_key),
            ) {
                map.retired.insert(retired_key, survivor_key);
            }
        }

        map
    }

    fn collect_latent_duplicates(&self) -> Vec<LatentDuplicate> {
        let mut duplicates: Vec<LatentDuplicate> = self
            .rows_by_name
            .iter()
            .filter(|(_, keys)| keys.len() > 1)
            .map(|(name, keys)| LatentDuplicate {
                kind: DuplicateKind::NormalizedName,
                value: name.clone(),
                members: self.summaries_for(keys),
            })
            .chain(
                self.rows_by_legacy
                    .iter()
                    .filter(|(_, keys)| keys.len() > 1)
                    .map(|(legacy, keys)| LatentDuplicate {
                        kind: DuplicateKind::LegacyKey,
                        value: legacy.to_string(),
                        members: self.summaries_for(keys),
                    }),
            )
            .collect();

        duplicates.sort_by(|a, b| {
            (a.kind == DuplicateKind::LegacyKey, &a.value)
                .cmp(&(b.kind == DuplicateKind::LegacyKey, &b.value))
        });
        duplicates
    }

    fn summaries_for(&self, keys: &[CanonicalKey]) -> Vec<IngredientSummary> {
        keys.iter()
            .filter_map(|key| self.live.get(key).cloned())
            .collect()
    }

    pub fn latent_duplicates(&self) -> &[LatentDuplicate] {
        &self.latent_duplicates
    }

    /// Rows skipped because their key did not have canonical shape.
    pub fn malformed_rows(&self) -> &[String] {
        &self.malformed_rows
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&IngredientSummary> {
        self.live.get(key)
    }

    pub fn is_live(&self, key: &CanonicalKey) -> bool {
        self.live.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live ingredients in catalog snapshot order.
    pub fn ingredients(&self) -> impl Iterator<Item = &IngredientSummary> {
        self.catalog_order
            .iter()
            .filter_map(|key| self.live.get(key))
    }

    pub fn legacy_key_count(&self) -> usize {
        self.legacy_to_canonical.len()
    }

    pub fn name_count(&self) -> usize {
        self.name_to_canonical.len()
    }
}

/// Snapshot the catalog and build the identity map.
pub async fn load_identity_map(pool: &SqlitePool) -> Result<IdentityMap, sqlx::Error> {
    let rows = ingredient_repo::get_all_ingredients(pool).await?;
    let retired = ingredient_repo::get_retired_keys(pool).await?;
    let map = IdentityMap::build(&rows, &retired);
    log::debug!(
        "Identity map built: {} live, {} legacy keys, {} names, {} latent duplicates",
        map.len(),
        map.legacy_key_count(),
        map.name_count(),
        map.latent_duplicates.len()
    );
    Ok(map)
}

#[cfg(test)]
#[path = "tests/map_builder_tests.rs"]
mod tests;
