#![allow(dead_code)]

use mixwise_lib::database::models::{IngredientRow, RecipeRow, ReferenceStore};
use mixwise_lib::database::{ingredient_repo, recipe_repo, reference_repo};
use mixwise_lib::services::catalog::create_slug;
use mixwise_lib::services::identity::normalize_name;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Once;

static INIT: Once = Once::new();

pub const VODKA: &str = "a1000000-0000-4000-8000-000000000001";
pub const ABSOLUT: &str = "a1000000-0000-4000-8000-000000000002";
pub const LIME_JUICE: &str = "a1000000-0000-4000-8000-000000000003";
pub const TEQUILA: &str = "a1000000-0000-4000-8000-000000000004";
pub const TRIPLE_SEC: &str = "a1000000-0000-4000-8000-000000000005";

pub struct TestContext {
    pub pool: Pool<Sqlite>,
}

pub async fn init_test_db() -> TestContext {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });

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

pub async fn seed_ingredient(pool: &Pool<Sqlite>, key: &str, name: &str, legacy_key: Option<i64>) {
    let row = IngredientRow {
        canonical_key: key.to_string(),
        display_name: name.to_string(),
        normalized_name: normalize_name(name),
        legacy_key,
        category: "other".to_string(),
        is_staple: false,
    };
    let mut conn = pool.acquire().await.unwrap();
    ingredient_repo::upsert_ingredient(&mut conn, &row).await.unwrap();
}

pub async fn seed_recipe(pool: &Pool<Sqlite>, id: &str, name: &str, requirements: &[(&str, bool)]) {
    let mut conn = pool.acquire().await.unwrap();
    let row = RecipeRow {
        id: id.to_string(),
        slug: create_slug(name),
        name: name.to_string(),
        sort_order: 0,
    };
    recipe_repo::upsert_recipe(&mut conn, &row).await.unwrap();
    let rows: Vec<(String, Option<String>, bool)> = requirements
        .iter()
        .map(|(key, optional)| (key.to_string(), Some("1 oz".to_string()), *optional))
        .collect();
    recipe_repo::replace_requirements(&mut conn, id, &rows)
        .await
        .unwrap();
}

pub async fn seed_reference(pool: &Pool<Sqlite>, store: ReferenceStore, user: &str, key: &str) {
    let mut conn = pool.acquire().await.unwrap();
    reference_repo::insert_ownership(&mut conn, store, user, key, None)
        .await
        .unwrap();
}

pub async fn user_keys(pool: &Pool<Sqlite>, store: ReferenceStore, user: &str) -> Vec<String> {
    reference_repo::get_user_keys(pool, store, user).await.unwrap()
}
