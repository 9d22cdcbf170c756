use serde::Serialize;
use thiserror::Error;

/// Failure to resolve one identifier to a live canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "error")]
pub enum ResolveError {
    #[error("Unresolved identifier: '{identifier}'")]
    UnresolvedIdentifier { identifier: String },

    /// Canonical-shaped key with no live row behind it. `retired_into` is
    /// filled when the key was retired by a merge; it is a hint for the
    /// operator and is never followed automatically.
    #[error("Orphaned canonical key: {key}")]
    OrphanedCanonicalKey {
        key: String,
        retired_into: Option<String>,
    },

    #[error("Ambiguous ingredient name '{name}' matches {count} live rows", count = .candidates.len())]
    AmbiguousName {
        name: String,
        candidates: Vec<String>,
    },
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UnresolvedIdentifier { .. } => "unresolved_identifier",
            ResolveError::OrphanedCanonicalKey { .. } => "orphaned_canonical_key",
            ResolveError::AmbiguousName { .. } => "ambiguous_name",
        }
    }
}

/// Error surfaced by the operator command layer.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CommandError {
    fn from(error: sqlx::Error) -> Self {
        CommandError::Database(error.to_string())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(error: std::io::Error) -> Self {
        CommandError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(error: serde_json::Error) -> Self {
        CommandError::Validation(format!("Malformed JSON: {error}"))
    }
}

impl From<ResolveError> for CommandError {
    fn from(error: ResolveError) -> Self {
        CommandError::Validation(error.to_string())
    }
}

impl From<crate::services::merge::MergeError> for CommandError {
    fn from(error: crate::services::merge::MergeError) -> Self {
        use crate::services::merge::MergeError;
        match error {
            MergeError::Database(msg) => CommandError::Database(msg),
            other => CommandError::Validation(other.to_string()),
        }
    }
}

impl From<crate::services::migration::MigrationError> for CommandError {
    fn from(error: crate::services::migration::MigrationError) -> Self {
        use crate::services::migration::MigrationError;
        match error {
            MigrationError::Database(msg) => CommandError::Database(msg),
            other => CommandError::Validation(other.to_string()),
        }
    }
}

impl From<crate::services::catalog::CatalogError> for CommandError {
    fn from(error: crate::services::catalog::CatalogError) -> Self {
        use crate::services::catalog::CatalogError;
        match error {
            CatalogError::Database(msg) => CommandError::Database(msg),
            other => CommandError::Validation(other.to_string()),
        }
    }
}

impl Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
