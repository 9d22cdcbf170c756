//! Pure set matching over a resolved recipe catalog.
//!
//! `required = { r.ingredient | !r.optional }`. A recipe is ready when every
//! required key is owned and one-away when exactly one is missing; two or
//! more missing never qualifies. No store access happens here.

use crate::types::CanonicalKey;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequirement {
    pub ingredient: CanonicalKey,
    pub optional: bool,
    pub quantity_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub requirements: Vec<RecipeRequirement>,
}

impl Recipe {
    /// Distinct required keys, in requirement order.
    pub fn required(&self) -> Vec<&CanonicalKey> {
        let mut seen = HashSet::new();
        self.requirements
            .iter()
            .filter(|r| !r.optional)
            .map(|r| &r.ingredient)
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            slug: recipe.slug.clone(),
            name: recipe.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneAwayMatch {
    pub recipe: RecipeSummary,
    pub missing: CanonicalKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub ready: Vec<RecipeSummary>,
    pub one_away: Vec<OneAwayMatch>,
}

enum Classification<'a> {
    Ready,
    OneAway(&'a CanonicalKey),
    Unavailable,
}

fn classify<'a>(recipe: &'a Recipe, owned: &HashSet<CanonicalKey>) -> Classification<'a> {
    let mut missing = None;
    for key in recipe.required() {
        if owned.contains(key) {
            continue;
        }
        if missing.is_some() {
            return Classification::Unavailable;
        }
        missing = Some(key);
    }
    match missing {
        None => Classification::Ready,
        Some(key) => Classification::OneAway(key),
    }
}

/// Classify every recipe against `owned`, keeping catalog order.
///
/// `limit` caps `ready` and `one_away` independently.
pub fn match_recipes(
    owned: &HashSet<CanonicalKey>,
    recipes: &[Recipe],
    limit: Option<usize>,
) -> MatchResult {
    let classified: Vec<Classification<'_>> =
        recipes.par_iter().map(|recipe| classify(recipe, owned)).collect();

    let cap = limit.unwrap_or(usize::MAX);
    let mut result = MatchResult::default();
    for (recipe, classification) in recipes.iter().zip(classified) {
        match classification {
            Classification::Ready if result.ready.len() < cap => {
                result.ready.push(RecipeSummary::from(recipe));
            }
            Classification::OneAway(missing) if result.one_away.len() < cap => {
                result.one_away.push(OneAwayMatch {
                    recipe: RecipeSummary::from(recipe),
                    missing: missing.clone(),
                });
            }
            _ => {}
        }
    }

    log::debug!(
        "Matched {} recipes against {} owned: {} ready, {} one away",
        recipes.len(),
        owned.len(),
        result.ready.len(),
        result.one_away.len()
    );
    result
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
