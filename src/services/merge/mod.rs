//! Duplicate merger: turns a curated set of names believed to denote one
//! ingredient into a plan of reference rewrites. Never writes.

pub mod planner;
pub mod suggestion;

pub use planner::{plan_merge, plan_merge_from_store, MergeOutcome, MergeRequest};
pub use suggestion::{suggest_survivor, SurvivorSuggestion};

use crate::services::identity::IngredientSummary;
use crate::types::errors::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No merge candidates supplied")]
    EmptyCandidates,

    #[error("Merge candidate '{name}' did not resolve: {source}")]
    UnresolvedCandidate {
        name: String,
        #[source]
        source: ResolveError,
    },

    /// Three or more live rows: refused outright, manual review required.
    #[error("Ambiguous duplicate: {count} live ingredients matched the candidates; manual review required", count = .candidates.len())]
    AmbiguousDuplicate { candidates: Vec<IngredientSummary> },

    #[error("Two ingredients matched; choose a survivor explicitly{}", suggestion_hint(.suggestion))]
    SurvivorRequired {
        candidates: Vec<IngredientSummary>,
        suggestion: Option<SurvivorSuggestion>,
    },

    #[error("Survivor '{survivor}' is not one of the merge candidates")]
    SurvivorNotCandidate { survivor: String },

    #[error("Database error: {0}")]
    Database(String),
}

fn suggestion_hint(suggestion: &Option<SurvivorSuggestion>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (suggested: {} '{}')", s.key, s.display_name))
        .unwrap_or_default()
}

impl From<sqlx::Error> for MergeError {
    fn from(error: sqlx::Error) -> Self {
        MergeError::Database(error.to_string())
    }
}
