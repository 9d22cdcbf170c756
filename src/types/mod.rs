pub mod errors;
pub mod ingredient_ref;

pub use ingredient_ref::{CanonicalKey, IngredientRef};
