use serde::Serialize;
use sqlx::SqlitePool;

use crate::services::catalog::{find_duplicates, DuplicateReport};
use crate::services::identity::load_identity_map;
use crate::types::errors::{CommandResult, ResolveError};
use crate::types::IngredientRef;

/// Resolution result for one operator-supplied identifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeOutcome {
    pub identifier: String,
    pub shape: &'static str,
    pub canonical_key: Option<String>,
    pub display_name: Option<String>,
    pub error: Option<ResolveError>,
}

impl NormalizeOutcome {
    pub fn is_resolved(&self) -> bool {
        self.error.is_none()
    }
}

pub async fn normalize_cmd(
    pool: &SqlitePool,
    identifiers: &[String],
) -> CommandResult<Vec<NormalizeOutcome>> {
    let map = load_identity_map(pool).await?;

    let outcomes = identifiers
        .iter()
        .map(|raw| {
            let identifier = IngredientRef::classify(raw);
            let shape = identifier.shape();
            match map.normalize(&identifier) {
                Ok(key) => NormalizeOutcome {
                    identifier: raw.clone(),
                    shape,
                    display_name: map.get(&key).map(|s| s.display_name.clone()),
                    canonical_key: Some(key.to_string()),
                    error: None,
                },
                Err(e) => {
                    log::debug!("Identifier '{raw}' did not resolve: {e}");
                    NormalizeOutcome {
                        identifier: raw.clone(),
                        shape,
                        canonical_key: None,
                        display_name: None,
                        error: Some(e),
                    }
                }
            }
        })
        .collect();
    Ok(outcomes)
}

pub async fn latent_duplicates_cmd(pool: &SqlitePool) -> CommandResult<DuplicateReport> {
    let map = load_identity_map(pool).await?;
    Ok(find_duplicates(&map))
}
