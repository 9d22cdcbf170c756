//! Recipe matchability: which recipes an owned set can make now, and which
//! are one ingredient short.

pub mod catalog;
pub mod engine;

pub use catalog::{
    load_owned_for_user, load_recipe_catalog, resolve_owned, ExcludedRecipe, OwnedSet,
    RecipeCatalog, UnresolvedReference,
};
pub use engine::{match_recipes, MatchResult, OneAwayMatch, Recipe, RecipeRequirement, RecipeSummary};
