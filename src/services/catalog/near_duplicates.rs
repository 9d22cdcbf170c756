use crate::services::identity::{IdentityMap, IngredientSummary, LatentDuplicate};
use crate::services::merge::{suggest_survivor, SurvivorSuggestion};
use serde::Serialize;
use std::collections::HashSet;

/// Jaro-Winkler similarity at or above which two names are reported.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.92;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearDuplicate {
    pub first: IngredientSummary,
    pub second: IngredientSummary,
    pub similarity: f64,
    pub reason: String,
    pub suggestion: SurvivorSuggestion,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub exact: Vec<LatentDuplicate>,
    pub possible: Vec<NearDuplicate>,
}

fn token_subset(a: &str, b: &str) -> bool {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    !a.is_empty() && !b.is_empty() && (a.is_subset(&b) || b.is_subset(&a))
}

/// Exact latent duplicates plus pairs that look alike. Report only.
pub fn find_duplicates(map: &IdentityMap) -> DuplicateReport {
    let ingredients: Vec<&IngredientSummary> = map.ingredients().collect();
    let mut possible = Vec::new();

    for (i, first) in ingredients.iter().enumerate() {
        for second in &ingredients[i + 1..] {
            // Exact collisions are already in the latent duplicate list.
            if first.normalized_name == second.normalized_name {
                continue;
            }
            let similarity = strsim::jaro_winkler(&first.normalized_name, &second.normalized_name);
            let reason = if similarity >= NEAR_DUPLICATE_THRESHOLD {
                format!("similar names ({similarity:.2})")
            } else if token_subset(&first.normalized_name, &second.normalized_name) {
                "one name contains the other".to_string()
            } else {
                continue;
            };
            possible.push(NearDuplicate {
                first: (*first).clone(),
                second: (*second).clone(),
                similarity,
                reason,
                suggestion: suggest_survivor(first, second),
            });
        }
    }

    possible.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    log::info!(
        "Duplicate report: {} exact, {} possible",
        map.latent_duplicates().len(),
        possible.len()
    );
    DuplicateReport {
        exact: map.latent_duplicates().to_vec(),
        possible,
    }
}

#[cfg(test)]
#[path = "tests/near_duplicates_tests.rs"]
mod tests;
