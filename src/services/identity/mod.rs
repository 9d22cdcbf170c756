//! Ingredient identity: the canonical lookup tables and the resolver that
//! turns any historical identifier shape into one live canonical key.

pub mod map_builder;
pub mod normalizer;

pub use map_builder::{
    load_identity_map, DuplicateKind, IdentityMap, IngredientSummary, LatentDuplicate,
};
pub use normalizer::normalize_name;
