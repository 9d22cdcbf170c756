//! Survivor suggestion for two-way merges.
//!
//! The suggestion is advisory. The merge contract always requires the
//! caller to name the survivor; this only pre-fills the operator's choice.

use crate::services::identity::IngredientSummary;
use crate::types::CanonicalKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivorSuggestion {
    pub key: CanonicalKey,
    pub display_name: String,
    pub reason: String,
}

fn tokens(name: &str) -> HashSet<&str> {
    name.split_whitespace().collect()
}

/// Prefer the generic, unbranded name of the pair.
///
/// Tie-breaks, in order: the name whose tokens are a strict subset of the
/// other's, the shorter normalized name, the staple row, the smaller key.
pub fn suggest_survivor(a: &IngredientSummary, b: &IngredientSummary) -> SurvivorSuggestion {
    let (winner, reason) = pick(a, b);
    SurvivorSuggestion {
        key: winner.key.clone(),
        display_name: winner.display_name.clone(),
        reason: reason.to_string(),
    }
}

fn pick<'a>(
    a: &'a IngredientSummary,
    b: &'a IngredientSummary,
) -> (&'a IngredientSummary, &'static str) {
    let tokens_a = tokens(&a.normalized_name);
    let tokens_b = tokens(&b.normalized_name);

    if tokens_a.len() < tokens_b.len() && tokens_a.is_subset(&tokens_b) {
        return (a, "generic name contained in the other name");
    }
    if tokens_b.len() < tokens_a.len() && tokens_b.is_subset(&tokens_a) {
        return (b, "generic name contained in the other name");
    }

    let len_a = a.normalized_name.len();
    let len_b = b.normalized_name.len();
    if len_a != len_b {
        return if len_a < len_b {
            (a, "shorter name")
        } else {
            (b, "shorter name")
        };
    }

    if a.is_staple != b.is_staple {
        return if a.is_staple {
            (a, "marked as staple")
        } else {
            (b, "marked as staple")
        };
    }

    if a.key <= b.key {
        (a, "lowest canonical key")
    } else {
        (b, "lowest canonical key")
    }
}

#[cfg(test)]
#[path = "tests/suggestion_tests.rs"]
mod tests;
