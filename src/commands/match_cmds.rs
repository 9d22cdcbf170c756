use serde::Serialize;
use sqlx::SqlitePool;

use crate::services::identity::load_identity_map;
use crate::services::matching::{
    load_owned_for_user, load_recipe_catalog, match_recipes, resolve_owned, ExcludedRecipe,
    MatchResult, UnresolvedReference,
};
use crate::types::errors::{CommandError, CommandResult};
use crate::types::CanonicalKey;

#[derive(Debug, Clone)]
pub enum OwnedSource {
    /// The owned-ingredient store of one user.
    User(String),
    /// Identifiers of any shape given on the command line.
    Identifiers(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub owned: Vec<CanonicalKey>,
    pub unresolved_owned: Vec<UnresolvedReference>,
    pub excluded_recipes: Vec<ExcludedRecipe>,
    #[serde(flatten)]
    pub result: MatchResult,
}

pub async fn match_cmd(
    pool: &SqlitePool,
    source: OwnedSource,
    limit: Option<usize>,
) -> CommandResult<MatchResponse> {
    let map = load_identity_map(pool).await?;

    let owned = match &source {
        OwnedSource::User(user_id) => {
            if user_id.trim().is_empty() {
                return Err(CommandError::Validation("User id must not be empty".into()));
            }
            load_owned_for_user(pool, &map, user_id).await?
        }
        OwnedSource::Identifiers(identifiers) => resolve_owned(&map, identifiers.as_slice()),
    };
    for reference in &owned.unresolved {
        log::warn!(
            "Ignoring owned reference '{}': {}",
            reference.raw_key,
            reference.error
        );
    }

    let catalog = load_recipe_catalog(pool, &map).await?;
    let result = match_recipes(&owned.keys, &catalog.recipes, limit);

    let mut keys: Vec<CanonicalKey> = owned.keys.into_iter().collect();
    keys.sort();
    Ok(MatchResponse {
        owned: keys,
        unresolved_owned: owned.unresolved,
        excluded_recipes: catalog.excluded,
        result,
    })
}
