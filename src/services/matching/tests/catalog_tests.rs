use super::*;
use crate::services::identity::load_identity_map;
use crate::services::matching::match_recipes;
use crate::test_utils::{
    init_test_db, seed_ingredient, seed_ownership, seed_recipe, LIME_JUICE, TEQUILA, TRIPLE_SEC,
};

async fn seed_bar(pool: &SqlitePool) {
    seed_ingredient(pool, TEQUILA, "Tequila", Some(10)).await;
    seed_ingredient(pool, LIME_JUICE, "Lime Juice", None).await;
    seed_ingredient(pool, TRIPLE_SEC, "Triple Sec", None).await;

    seed_recipe(
        pool,
        "margarita",
        "Margarita",
        1,
        &[("10", false), ("lime juice", false), (TRIPLE_SEC, false)],
    )
    .await;
    seed_recipe(pool, "paloma", "Paloma", 2, &[(TEQUILA, false), ("Grapefruit Soda", false)]).await;
    seed_recipe(pool, "shot", "Tequila Shot", 0, &[(TEQUILA, false), (LIME_JUICE, true)]).await;
}

#[tokio::test]
async fn test_catalog_resolves_mixed_shapes_in_order() {
    let pool = init_test_db().await.pool;
    seed_bar(&pool).await;
    let map = load_identity_map(&pool).await.unwrap();

    let catalog = load_recipe_catalog(&pool, &map).await.unwrap();

    let ids: Vec<&str> = catalog.recipes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["shot", "margarita"]);
    assert_eq!(catalog.recipes[1].requirements[0].ingredient.as_str(), TEQUILA);
    assert_eq!(
        catalog.recipes[1].requirements[0].quantity_text.as_deref(),
        Some("1 oz")
    );

    assert_eq!(catalog.excluded.len(), 1);
    assert_eq!(catalog.excluded[0].id, "paloma");
    assert_eq!(catalog.excluded[0].unresolved[0].raw_key, "Grapefruit Soda");
}

#[tokio::test]
async fn test_match_for_stored_user() {
    let pool = init_test_db().await.pool;
    seed_bar(&pool).await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", "10").await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", "Lime Juice").await;
    seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", "Mezcal").await;
    let map = load_identity_map(&pool).await.unwrap();

    let owned = load_owned_for_user(&pool, &map, "alice").await.unwrap();
    assert_eq!(owned.keys.len(), 2);
    assert_eq!(owned.unresolved.len(), 1);
    assert_eq!(owned.unresolved[0].raw_key, "Mezcal");

    let catalog = load_recipe_catalog(&pool, &map).await.unwrap();
    let result = match_recipes(&owned.keys, &catalog.recipes, None);

    assert_eq!(result.ready.len(), 1);
    assert_eq!(result.ready[0].name, "Tequila Shot");
    assert_eq!(result.one_away.len(), 1);
    assert_eq!(result.one_away[0].missing.as_str(), TRIPLE_SEC);
}

#[test]
fn test_resolve_owned_deduplicates_shapes() {
    let map = IdentityMap::build(
        &[crate::test_utils::ingredient(TEQUILA, "Tequila", Some(10))],
        &[],
    );

    let owned = resolve_owned(&map, &["10", "tequila", TEQUILA]);

    assert_eq!(owned.keys.len(), 1);
    assert!(owned.unresolved.is_empty());
}
