use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the `ingredients` catalog table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct IngredientRow {
    pub canonical_key: String,
    pub display_name: String,
    pub normalized_name: String,
    pub legacy_key: Option<i64>,
    pub category: String,
    pub is_staple: bool,
}

/// One row of the `recipes` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub sort_order: i64,
}

/// One requirement of a recipe, still holding the raw stored reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RecipeRequirementRow {
    pub id: i64,
    pub recipe_id: String,
    pub position: i64,
    pub ingredient_key: String,
    pub quantity_text: Option<String>,
    pub is_optional: bool,
}

/// A record store that holds ingredient references.
///
/// Each store is managed independently; nothing here assumes a cross-store
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStore {
    OwnedIngredients,
    ShoppingList,
    RecipeIngredients,
}

impl ReferenceStore {
    pub const ALL: [ReferenceStore; 3] = [
        ReferenceStore::OwnedIngredients,
        ReferenceStore::ShoppingList,
        ReferenceStore::RecipeIngredients,
    ];

    pub fn table(self) -> &'static str {
        match self {
            ReferenceStore::OwnedIngredients => "owned_ingredients",
            ReferenceStore::ShoppingList => "shopping_list",
            ReferenceStore::RecipeIngredients => "recipe_ingredients",
        }
    }

    /// Column naming the record's owner: the user for ownership stores,
    /// the recipe for requirements.
    pub fn owner_column(self) -> &'static str {
        match self {
            ReferenceStore::OwnedIngredients | ReferenceStore::ShoppingList => "user_id",
            ReferenceStore::RecipeIngredients => "recipe_id",
        }
    }

    /// Ownership stores cache the ingredient display name next to the key.
    pub fn has_cached_name(self) -> bool {
        !matches!(self, ReferenceStore::RecipeIngredients)
    }
}

impl fmt::Display for ReferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for ReferenceStore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "owned_ingredients" | "owned" => Ok(ReferenceStore::OwnedIngredients),
            "shopping_list" | "shopping" => Ok(ReferenceStore::ShoppingList),
            "recipe_ingredients" | "recipes" => Ok(ReferenceStore::RecipeIngredients),
            _ => Err(format!("Unknown reference store: {s}")),
        }
    }
}

/// A single stored ingredient reference, uniform across stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct StoredReference {
    pub id: i64,
    pub owner_id: String,
    pub ingredient_key: String,
    pub is_optional: bool,
}

/// One row of the `migration_runs` audit table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MigrationRunRow {
    pub id: String,
    pub plan_kind: String,
    pub plan_fingerprint: String,
    pub mode: String,
    pub status: String,
    pub summary: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}
