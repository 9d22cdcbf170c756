use crate::database::models::{IngredientRow, RecipeRow, ReferenceStore};
use crate::database::{ingredient_repo, recipe_repo, reference_repo};
use crate::services::identity::normalize_name;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Once;

static INIT: Once = Once::new();

pub const VODKA: &str = "11111111-1111-4111-8111-111111111111";
pub const ABSOLUT: &str = "22222222-2222-4222-8222-222222222222";
pub const LIME_JUICE: &str = "33333333-3333-4333-8333-333333333333";
pub const TEQUILA: &str = "44444444-4444-4444-8444-444444444444";
pub const TRIPLE_SEC: &str = "55555555-5555-4555-8555-555555555555";
pub const GIN: &str = "66666666-6666-4666-8666-666666666666";

pub struct TestContext {
    pub pool: Pool<Sqlite>,
}

pub async fn init_test_db() -> TestContext {
    INIT.call_once(|| {
        // Initialize logger only once
        let _ = env_logger::builder().is_test(true).try_init();
    });

    // Single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    TestContext { pool }
}

pub fn ingredient(key: &str, name: &str, legacy_key: Option<i64>) -> IngredientRow {
    IngredientRow {
        canonical_key: key.to_string(),
        display_name: name.to_string(),
        normalized_name: normalize_name(name),
        legacy_key,
        category: "spirit".to_string(),
        is_staple: false,
    }
}

pub async fn seed_ingredient(pool: &Pool<Sqlite>, key: &str, name: &str, legacy_key: Option<i64>) {
    let mut conn = pool.acquire().await.unwrap();
    ingredient_repo::upsert_ingredient(&mut conn, &ingredient(key, name, legacy_key))
        .await
        .unwrap();
}

/// Seed a recipe; requirements are `(raw key, is_optional)`.
pub async fn seed_recipe(
    pool: &Pool<Sqlite>,
    id: &str,
    name: &str,
    sort_order: i64,
    requirements: &[(&str, bool)],
) {
    let mut conn = pool.acquire().await.unwrap();
    recipe_repo::upsert_recipe(
        &mut conn,
        &RecipeRow {
            id: id.to_string(),
            slug: crate::services::catalog::create_slug(name),
            name: name.to_string(),
            sort_order,
        },
    )
    .await
    .unwrap();
    let rows: Vec<(String, Option<String>, bool)> = requirements
        .iter()
        .map(|(key, optional)| (key.to_string(), Some("1 oz".to_string()), *optional))
        .collect();
    recipe_repo::replace_requirements(&mut conn, id, &rows)
        .await
        .unwrap();
}

pub async fn seed_ownership(pool: &Pool<Sqlite>, store: ReferenceStore, user: &str, key: &str) {
    let mut conn = pool.acquire().await.unwrap();
    reference_repo::insert_ownership(&mut conn, store, user, key, Some("cached"))
        .await
        .unwrap();
}

pub async fn count_rows(pool: &Pool<Sqlite>, store: ReferenceStore) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    reference_repo::count_references(&mut conn, store)
        .await
        .unwrap()
}
