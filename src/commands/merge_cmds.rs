use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;

use super::migration_cmds::write_plan;
use crate::services::identity::{load_identity_map, IngredientSummary};
use crate::services::merge::{
    plan_merge_from_store, MergeError, MergeOutcome, MergeRequest, SurvivorSuggestion,
};
use crate::services::migration::{MergePlan, MigrationPlan};
use crate::types::errors::CommandResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum MergeResponse {
    /// The candidates already denote one row; no plan was produced.
    AlreadyMerged { ingredient: IngredientSummary },
    #[serde(rename_all = "camelCase")]
    Planned {
        fingerprint: String,
        action_count: usize,
        collapse_count: usize,
        plan_path: Option<String>,
        plan: Box<MergePlan>,
    },
    /// The merge contract refused the request; nothing was planned.
    Refused {
        error: String,
        candidates: Vec<IngredientSummary>,
        suggestion: Option<SurvivorSuggestion>,
    },
}

impl MergeResponse {
    pub fn is_refused(&self) -> bool {
        matches!(self, MergeResponse::Refused { .. })
    }
}

/// Plan a merge and, when `plan_out` is given, save it for `run-migration`.
pub async fn plan_merge_cmd(
    pool: &SqlitePool,
    request: MergeRequest,
    plan_out: Option<&Path>,
) -> CommandResult<MergeResponse> {
    let map = load_identity_map(pool).await?;

    let outcome = match plan_merge_from_store(pool, &map, &request).await {
        Ok(outcome) => outcome,
        Err(MergeError::Database(msg)) => return Err(MergeError::Database(msg).into()),
        Err(refusal) => {
            log::warn!("Merge refused: {refusal}");
            return Ok(refused(refusal));
        }
    };

    match outcome {
        MergeOutcome::AlreadyMerged { ingredient } => Ok(MergeResponse::AlreadyMerged { ingredient }),
        MergeOutcome::Planned(plan) => {
            let plan_path = match plan_out {
                Some(path) => {
                    write_plan(path, &MigrationPlan::Merge((*plan).clone()))?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            Ok(MergeResponse::Planned {
                fingerprint: plan.fingerprint.clone(),
                action_count: plan.actions.len(),
                collapse_count: plan.actions.iter().filter(|a| a.is_collapse()).count(),
                plan_path,
                plan,
            })
        }
    }
}

fn refused(error: MergeError) -> MergeResponse {
    let message = error.to_string();
    let (candidates, suggestion) = match error {
        MergeError::AmbiguousDuplicate { candidates } => (candidates, None),
        MergeError::SurvivorRequired {
            candidates,
            suggestion,
        } => (candidates, suggestion),
        _ => (Vec::new(), None),
    };
    MergeResponse::Refused {
        error: message,
        candidates,
        suggestion,
    }
}
