//! JSON catalog import.

use super::slug::{claim_unique_slug, create_slug};
use super::CatalogError;
use crate::database::models::{IngredientRow, RecipeRow};
use crate::database::{ingredient_repo, recipe_repo};
use crate::services::identity::{normalize_name, IdentityMap};
use crate::types::CanonicalKey;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub recipes: Vec<RecipeInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    pub canonical_key: Option<String>,
    pub display_name: String,
    pub legacy_key: Option<i64>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_staple: bool,
}

fn default_category() -> String {
    "other".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub ingredients: Vec<RequirementInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementInput {
    /// Any identifier shape; resolved to a canonical key when possible.
    pub ingredient: String,
    pub quantity: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub ingredients_inserted: usize,
    pub ingredients_updated: usize,
    pub recipes_imported: usize,
    /// `(original slug, assigned slug)` for slugs that collided.
    pub renamed_slugs: Vec<(String, String)>,
    /// Requirements stored as given because they did not resolve.
    pub unresolved_requirements: Vec<String>,
}

pub async fn import_catalog(
    pool: &SqlitePool,
    document: &CatalogDocument,
) -> Result<ImportSummary, CatalogError> {
    let existing = ingredient_repo::get_all_ingredients(pool).await?;
    let retired = ingredient_repo::get_retired_keys(pool).await?;
    let existing_slugs = recipe_repo::get_all_slugs(pool).await?;

    let retired_keys: HashSet<&str> = retired.iter().map(|(key, _)| key.as_str()).collect();
    let existing_keys: HashSet<String> = existing.iter().map(|r| r.canonical_key.clone()).collect();

    let mut summary = ImportSummary::default();
    let new_rows = prepare_ingredients(&document.ingredients, &retired_keys)?;
    for row in &new_rows {
        if existing_keys.contains(&row.canonical_key) {
            summary.ingredients_updated += 1;
        } else {
            summary.ingredients_inserted += 1;
        }
    }

    // Resolve requirements against the catalog as it will be after the import.
    let mut merged: HashMap<String, IngredientRow> = existing
        .into_iter()
        .map(|row| (row.canonical_key.clone(), row))
        .collect();
    for row in &new_rows {
        merged.insert(row.canonical_key.clone(), row.clone());
    }
    let mut merged_rows: Vec<IngredientRow> = merged.into_values().collect();
    merged_rows.sort_by(|a, b| a.canonical_key.cmp(&b.canonical_key));
    let map = IdentityMap::build(&merged_rows, &retired);

    let recipes = prepare_recipes(&document.recipes, &existing_slugs, &map, &mut summary)?;

    let mut tx = pool.begin().await?;
    for row in &new_rows {
        ingredient_repo::upsert_ingredient(&mut *tx, row).await?;
    }
    for (row, requirements) in &recipes {
        recipe_repo::upsert_recipe(&mut *tx, row).await?;
        recipe_repo::replace_requirements(&mut *tx, &row.id, requirements).await?;
    }
    tx.commit().await?;

    summary.recipes_imported = recipes.len();
    log::info!(
        "Imported catalog: {} new ingredient(s), {} updated, {} recipe(s), {} unresolved requirement(s)",
        summary.ingredients_inserted,
        summary.ingredients_updated,
        summary.recipes_imported,
        summary.unresolved_requirements.len()
    );
    Ok(summary)
}

fn prepare_ingredients(
    inputs: &[IngredientInput],
    retired_keys: &HashSet<&str>,
) -> Result<Vec<IngredientRow>, CatalogError> {
    let mut rows = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let display_name = input.display_name.trim();
        let normalized_name = normalize_name(display_name);
        if normalized_name.is_empty() {
            return Err(CatalogError::EmptyName { index });
        }

        let key = match input.canonical_key.as_deref() {
            Some(raw) => CanonicalKey::parse(raw).ok_or_else(|| CatalogError::InvalidKey {
                name: display_name.to_string(),
                key: raw.to_string(),
            })?,
            None => CanonicalKey::generate(),
        };
        if retired_keys.contains(key.as_str()) {
            return Err(CatalogError::RetiredKey {
                key: key.to_string(),
            });
        }

        rows.push(IngredientRow {
            canonical_key: key.to_string(),
            display_name: display_name.to_string(),
            normalized_name,
            legacy_key: input.legacy_key,
            category: input.category.clone(),
            is_staple: input.is_staple,
        });
    }
    Ok(rows)
}

type PreparedRecipe = (RecipeRow, Vec<(String, Option<String>, bool)>);

fn prepare_recipes(
    inputs: &[RecipeInput],
    existing_slugs: &[(String, String)],
    map: &IdentityMap,
    summary: &mut ImportSummary,
) -> Result<Vec<PreparedRecipe>, CatalogError> {
    let importing: HashSet<&str> = inputs.iter().map(|r| r.id.as_str()).collect();
    // Slugs of recipes this import replaces are free again.
    let mut taken: HashSet<String> = existing_slugs
        .iter()
        .filter(|(id, _)| !importing.contains(id.as_str()))
        .map(|(_, slug)| slug.clone())
        .collect();

    let mut prepared = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        if input.id.trim().is_empty() || input.name.trim().is_empty() {
            return Err(CatalogError::InvalidRecipe { index });
        }

        let wanted = input
            .slug
            .clone()
            .unwrap_or_else(|| create_slug(&input.name));
        let slug = claim_unique_slug(wanted.clone(), &input.id, &mut taken);
        if slug != wanted {
            summary.renamed_slugs.push((wanted, slug.clone()));
        }

        let requirements = input
            .ingredients
            .iter()
            .map(|requirement| {
                let stored = match map.normalize_raw(&requirement.ingredient) {
                    Ok(key) => key.to_string(),
                    Err(e) => {
                        log::warn!("Recipe '{}': {}", input.name, e);
                        summary
                            .unresolved_requirements
                            .push(format!("{}: {}", input.id, requirement.ingredient));
                        requirement.ingredient.trim().to_string()
                    }
                };
                (stored, requirement.quantity.clone(), requirement.optional)
            })
            .collect();

        prepared.push((
            RecipeRow {
                id: input.id.trim().to_string(),
                slug,
                name: input.name.trim().to_string(),
                sort_order: input.sort_order,
            },
            requirements,
        ));
    }
    Ok(prepared)
}

#[cfg(test)]
#[path = "tests/import_tests.rs"]
mod tests;
