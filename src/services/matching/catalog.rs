//! Loading the recipe catalog and owned sets through the normalizer.

use super::engine::{Recipe, RecipeRequirement};
use crate::database::models::ReferenceStore;
use crate::database::{recipe_repo, reference_repo};
use crate::services::identity::IdentityMap;
use crate::types::CanonicalKey;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

/// A stored reference the normalizer rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedReference {
    pub raw_key: String,
    pub error: String,
}

/// A recipe left out of matching because a requirement did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedRecipe {
    pub id: String,
    pub name: String,
    pub unresolved: Vec<UnresolvedReference>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    pub recipes: Vec<Recipe>,
    pub excluded: Vec<ExcludedRecipe>,
}

#[derive(Debug, Clone, Default)]
pub struct OwnedSet {
    pub keys: HashSet<CanonicalKey>,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Recipes in catalog order with every requirement resolved.
pub async fn load_recipe_catalog(
    pool: &SqlitePool,
    map: &IdentityMap,
) -> Result<RecipeCatalog, sqlx::Error> {
    let rows = recipe_repo::get_recipes_ordered(pool).await?;
    let mut requirements: HashMap<String, Vec<_>> = HashMap::new();
    for requirement in recipe_repo::get_all_requirements(pool).await? {
        requirements
            .entry(requirement.recipe_id.clone())
            .or_default()
            .push(requirement);
    }

    let mut catalog = RecipeCatalog::default();
    for row in rows {
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for requirement in requirements.remove(&row.id).unwrap_or_default() {
            match map.normalize_raw(&requirement.ingredient_key) {
                Ok(key) => resolved.push(RecipeRequirement {
                    ingredient: key,
                    optional: requirement.is_optional,
                    quantity_text: requirement.quantity_text,
                }),
                Err(e) => unresolved.push(UnresolvedReference {
                    raw_key: requirement.ingredient_key,
                    error: e.to_string(),
                }),
            }
        }

        if unresolved.is_empty() {
            catalog.recipes.push(Recipe {
                id: row.id,
                slug: row.slug,
                name: row.name,
                requirements: resolved,
            });
        } else {
            log::warn!(
                "Recipe '{}' excluded from matching: {} unresolved requirement(s)",
                row.name,
                unresolved.len()
            );
            catalog.excluded.push(ExcludedRecipe {
                id: row.id,
                name: row.name,
                unresolved,
            });
        }
    }
    Ok(catalog)
}

/// Resolve identifiers of any shape; rejects are reported and ignored.
pub fn resolve_owned<S: AsRef<str>>(map: &IdentityMap, identifiers: &[S]) -> OwnedSet {
    let mut owned = OwnedSet::default();
    for raw in identifiers {
        let raw = raw.as_ref();
        match map.normalize_raw(raw) {
            Ok(key) => {
                owned.keys.insert(key);
            }
            Err(e) => owned.unresolved.push(UnresolvedReference {
                raw_key: raw.to_string(),
                error: e.to_string(),
            }),
        }
    }
    owned
}

pub async fn load_owned_for_user(
    pool: &SqlitePool,
    map: &IdentityMap,
    user_id: &str,
) -> Result<OwnedSet, sqlx::Error> {
    let raw = reference_repo::get_user_keys(pool, ReferenceStore::OwnedIngredients, user_id).await?;
    Ok(resolve_owned(map, raw.as_slice()))
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
