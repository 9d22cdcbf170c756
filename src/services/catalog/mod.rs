//! Catalog maintenance: validation, duplicate reporting, and JSON import.

pub mod import;
pub mod near_duplicates;
pub mod slug;
pub mod validator;

pub use import::{import_catalog, CatalogDocument, ImportSummary};
pub use near_duplicates::{find_duplicates, DuplicateReport, NearDuplicate};
pub use slug::{check_slug, claim_unique_slug, create_slug};
pub use validator::{
    check_quantity_text, validate_catalog, CatalogSnapshot, Finding, Severity, ValidationReport,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Ingredient '{name}' has an invalid canonical key '{key}'")]
    InvalidKey { name: String, key: String },

    #[error("Canonical key {key} was retired and cannot be reused")]
    RetiredKey { key: String },

    #[error("Ingredient #{index} has no usable display name")]
    EmptyName { index: usize },

    #[error("Recipe #{index} is missing an id or a name")]
    InvalidRecipe { index: usize },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(error: sqlx::Error) -> Self {
        CatalogError::Database(error.to_string())
    }
}
