use crate::commands::match_cmds::{match_cmd, OwnedSource};
use crate::database::models::ReferenceStore;
use crate::test_utils::{
    init_test_db, seed_ingredient, seed_ownership, seed_recipe, LIME_JUICE, TEQUILA, TRIPLE_SEC,
};
use crate::types::errors::CommandError;
use sqlx::SqlitePool;

async fn seed_margarita(pool: &SqlitePool) {
    seed_ingredient(pool, TEQUILA, "Tequila", Some(7)).await;
    seed_ingredient(pool, TRIPLE_SEC, "Triple Sec", None).await;
    seed_ingredient(pool, LIME_JUICE, "Lime Juice", None).await;
    seed_recipe(
        pool,
        "margarita",
        "Margarita",
        0,
        &[(TEQUILA, false), (TRIPLE_SEC, false), (LIME_JUICE, false)],
    )
    .await;
}

#[tokio::test]
async fn test_match_cmd_by_identifiers_one_away() {
    let pool = init_test_db().await.pool;
    seed_margarita(&pool).await;

    let response = match_cmd(
        &pool,
        OwnedSource::Identifiers(vec!["7".into(), "lime juice".into(), "Mezcal".into()]),
        None,
    )
    .await
    .unwrap();

    assert!(response.result.ready.is_empty());
    assert_eq!(response.result.one_away.len(), 1);
    assert_eq!(response.result.one_away[0].recipe.slug, "margarita");
    assert_eq!(response.result.one_away[0].missing.as_str(), TRIPLE_SEC);
    assert_eq!(response.owned.len(), 2);
    assert_eq!(response.unresolved_owned.len(), 1);
    assert_eq!(response.unresolved_owned[0].raw_key, "Mezcal");
}

#[tokio::test]
async fn test_match_cmd_for_stored_user_ready() {
    let pool = init_test_db().await.pool;
    seed_margarita(&pool).await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", TEQUILA).await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", "Triple Sec").await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", LIME_JUICE).await;

    let response = match_cmd(&pool, OwnedSource::User("alice".into()), Some(5))
        .await
        .unwrap();

    assert_eq!(response.result.ready.len(), 1);
    assert_eq!(response.result.ready[0].name, "Margarita");
    assert!(response.result.one_away.is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("ready").is_some());
    assert!(json.get("oneAway").is_some());
}

#[tokio::test]
async fn test_match_cmd_reports_excluded_recipes() {
    let pool = init_test_db().await.pool;
    seed_margarita(&pool).await;
    seed_recipe(&pool, "mystery", "Mystery Punch", 1, &[("Dragon Fruit", false)]).await;

    let response = match_cmd(&pool, OwnedSource::Identifiers(Vec::new()), None)
        .await
        .unwrap();

    assert_eq!(response.excluded_recipes.len(), 1);
    assert_eq!(response.excluded_recipes[0].id, "mystery");
}

#[tokio::test]
async fn test_match_cmd_rejects_blank_user() {
    let pool = init_test_db().await.pool;
    let err = match_cmd(&pool, OwnedSource::User("  ".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
}
