use super::*;
use crate::test_utils::{init_test_db, seed_recipe, LIME_JUICE, TEQUILA, TRIPLE_SEC};

#[tokio::test]
async fn test_recipes_come_back_in_catalog_order() {
    let pool = init_test_db().await.pool;
    seed_recipe(&pool, "r-2", "Paloma", 2, &[(TEQUILA, false)]).await;
    seed_recipe(&pool, "r-1", "Margarita", 1, &[(TEQUILA, false)]).await;
    seed_recipe(&pool, "r-3", "Daiquiri", 2, &[(LIME_JUICE, false)]).await;

    let recipes = get_recipes_ordered(&pool).await.unwrap();
    let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Margarita", "Daiquiri", "Paloma"]);
}

#[tokio::test]
async fn test_replace_requirements_keeps_listed_order() {
    let pool = init_test_db().await.pool;
    seed_recipe(
        &pool,
        "r-1",
        "Margarita",
        0,
        &[(TEQUILA, false), (LIME_JUICE, false), (TRIPLE_SEC, true)],
    )
    .await;

    let requirements = get_all_requirements(&pool).await.unwrap();
    assert_eq!(requirements.len(), 3);
    assert_eq!(requirements[0].ingredient_key, TEQUILA);
    assert_eq!(requirements[2].ingredient_key, TRIPLE_SEC);
    assert!(requirements[2].is_optional);

    // Replacing drops the previous list
    seed_recipe(&pool, "r-1", "Margarita", 0, &[(LIME_JUICE, false)]).await;
    let requirements = get_all_requirements(&pool).await.unwrap();
    assert_eq!(requirements.len(), 1);
    assert_eq!(requirements[0].position, 0);
}

#[tokio::test]
async fn test_get_all_slugs() {
    let pool = init_test_db().await.pool;
    seed_recipe(&pool, "r-1", "Tommy's Margarita", 0, &[]).await;

    let slugs = get_all_slugs(&pool).await.unwrap();
    assert_eq!(slugs, vec![("r-1".to_string(), "tommys-margarita".to_string())]);
}
