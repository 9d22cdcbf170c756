//! Catalog validation: slugs, quantity text, recipe shape, identity health,
//! and references that no longer resolve.

use super::slug::check_slug;
use crate::database::models::{IngredientRow, RecipeRequirementRow, RecipeRow};
use crate::database::{ingredient_repo, recipe_repo};
use crate::services::identity::{normalize_name, IdentityMap};
use crate::services::migration::plan::StoreSnapshot;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

static RE_HAS_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]").expect("Invalid regex"));

pub const MIN_RECIPE_REQUIREMENTS: usize = 2;
pub const MAX_RECIPE_REQUIREMENTS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    /// What the finding is about, e.g. `recipe:margarita`.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub ingredients_checked: usize,
    pub recipes_checked: usize,
    pub references_checked: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    fn error(&mut self, subject: String, message: String) {
        self.findings.push(Finding {
            severity: Severity::Error,
            subject,
            message,
        });
    }

    fn warning(&mut self, subject: String, message: String) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            subject,
            message,
        });
    }
}

/// Check one quantity string. Returns the problem, if any.
pub fn check_quantity_text(text: &str) -> Option<&'static str> {
    let text = text.trim();
    if text.is_empty() {
        return Some("Empty quantity");
    }
    if text.contains("???") {
        return Some("Contains '???'");
    }
    if text == "null" || text == "None" {
        return Some("Invalid null value");
    }
    if text.chars().count() < 2 {
        return Some("Too short");
    }
    if text.contains('|') {
        return Some("Contains pipe character (should be split)");
    }
    if !RE_HAS_LETTER.is_match(text) {
        return Some("No letters in quantity");
    }
    None
}

/// Everything the validator reads, loaded up front.
pub struct CatalogSnapshot {
    pub ingredients: Vec<IngredientRow>,
    pub recipes: Vec<RecipeRow>,
    pub requirements: Vec<RecipeRequirementRow>,
    pub stores: Vec<StoreSnapshot>,
}

impl CatalogSnapshot {
    pub async fn load(pool: &sqlx::SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            ingredients: ingredient_repo::get_all_ingredients(pool).await?,
            recipes: recipe_repo::get_recipes_ordered(pool).await?,
            requirements: recipe_repo::get_all_requirements(pool).await?,
            stores: crate::services::migration::load_store_snapshots(pool).await?,
        })
    }
}

pub fn validate_catalog(map: &IdentityMap, snapshot: &CatalogSnapshot) -> ValidationReport {
    let mut report = ValidationReport {
        ingredients_checked: snapshot.ingredients.len(),
        recipes_checked: snapshot.recipes.len(),
        ..Default::default()
    };

    check_ingredients(map, snapshot, &mut report);
    check_recipes(snapshot, &mut report);
    check_references(map, snapshot, &mut report);

    log::info!(
        "Catalog validation: {} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
    report
}

fn check_ingredients(map: &IdentityMap, snapshot: &CatalogSnapshot, report: &mut ValidationReport) {
    for key in map.malformed_rows() {
        report.error(
            format!("ingredient:{key}"),
            "Catalog key is not a canonical key".to_string(),
        );
    }

    for row in &snapshot.ingredients {
        let expected = normalize_name(&row.display_name);
        if expected.is_empty() {
            report.error(
                format!("ingredient:{}", row.canonical_key),
                format!("Display name '{}' normalizes to nothing", row.display_name),
            );
        } else if row.normalized_name != expected {
            report.warning(
                format!("ingredient:{}", row.canonical_key),
                format!(
                    "Stored normalized name '{}' is stale (expected '{expected}')",
                    row.normalized_name
                ),
            );
        }
    }

    for duplicate in map.latent_duplicates() {
        let names: Vec<&str> = duplicate
            .members
            .iter()
            .map(|m| m.display_name.as_str())
            .collect();
        report.warning(
            format!("duplicate:{}", duplicate.value),
            format!(
                "Latent duplicate ({:?}): {} live rows share '{}': {}",
                duplicate.kind,
                duplicate.members.len(),
                duplicate.value,
                names.join(", ")
            ),
        );
    }
}

fn check_recipes(snapshot: &CatalogSnapshot, report: &mut ValidationReport) {
    let mut by_recipe: HashMap<&str, Vec<&RecipeRequirementRow>> = HashMap::new();
    for requirement in &snapshot.requirements {
        by_recipe
            .entry(requirement.recipe_id.as_str())
            .or_default()
            .push(requirement);
    }

    let mut slug_owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for recipe in &snapshot.recipes {
        let subject = format!("recipe:{}", recipe.id);
        let (errors, warnings) = check_slug(&recipe.slug);
        for message in errors {
            report.error(subject.clone(), message);
        }
        for message in warnings {
            report.warning(subject.clone(), message);
        }
        slug_owners
            .entry(recipe.slug.as_str())
            .or_default()
            .push(recipe.id.as_str());

        let requirements = by_recipe.remove(recipe.id.as_str()).unwrap_or_default();
        if requirements.len() < MIN_RECIPE_REQUIREMENTS {
            report.warning(
                subject.clone(),
                format!("Only {} ingredient(s) listed", requirements.len()),
            );
        } else if requirements.len() > MAX_RECIPE_REQUIREMENTS {
            report.warning(
                subject.clone(),
                format!(
                    "{} ingredients listed (very complex recipe)",
                    requirements.len()
                ),
            );
        }

        for requirement in requirements {
            if let Some(text) = &requirement.quantity_text {
                if let Some(problem) = check_quantity_text(text) {
                    report.error(
                        subject.clone(),
                        format!(
                            "Ingredient #{}: {problem} - '{text}'",
                            requirement.position + 1
                        ),
                    );
                }
            }
        }
    }

    for (slug, owners) in slug_owners {
        if owners.len() > 1 && !slug.is_empty() {
            report.error(
                format!("slug:{slug}"),
                format!("Slug appears {} times: {}", owners.len(), owners.join(", ")),
            );
        }
    }
}

fn check_references(map: &IdentityMap, snapshot: &CatalogSnapshot, report: &mut ValidationReport) {
    for store in &snapshot.stores {
        report.references_checked += store.records.len();
        for record in &store.records {
            if let Err(e) = map.normalize_raw(&record.ingredient_key) {
                report.error(
                    format!("{}:{}", store.store, record.id),
                    format!("{} (owner {})", e, record.owner_id),
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
