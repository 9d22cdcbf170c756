use super::models::{RecipeRequirementRow, RecipeRow};
use sqlx::{SqliteConnection, SqlitePool};

/// Recipes in catalog order.
pub async fn get_recipes_ordered(pool: &SqlitePool) -> Result<Vec<RecipeRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipeRow>(
        "SELECT id, slug, name, sort_order FROM recipes ORDER BY sort_order, name, id",
    )
    .fetch_all(pool)
    .await
}

/// Every requirement row, grouped by recipe and in listed order.
pub async fn get_all_requirements(
    pool: &SqlitePool,
) -> Result<Vec<RecipeRequirementRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipeRequirementRow>(
        "SELECT id, recipe_id, position, ingredient_key, quantity_text, is_optional
         FROM recipe_ingredients
         ORDER BY recipe_id, position, id",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_all_slugs(pool: &SqlitePool) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as("SELECT id, slug FROM recipes ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn upsert_recipe(conn: &mut SqliteConnection, row: &RecipeRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO recipes (id, slug, name, sort_order) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            slug = excluded.slug,
            name = excluded.name,
            sort_order = excluded.sort_order",
    )
    .bind(&row.id)
    .bind(&row.slug)
    .bind(&row.name)
    .bind(row.sort_order)
    .execute(conn)
    .await?;
    Ok(())
}

/// Replace a recipe's requirement list wholesale.
pub async fn replace_requirements(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    requirements: &[(String, Option<String>, bool)],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    for (position, (ingredient_key, quantity_text, is_optional)) in
        requirements.iter().enumerate()
    {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, position, ingredient_key, quantity_text, is_optional)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(position as i64)
        .bind(ingredient_key)
        .bind(quantity_text)
        .bind(is_optional)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/recipe_repo_test.rs"]
mod tests;
