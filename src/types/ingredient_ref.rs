//! Identifier shapes for ingredient references.
//!
//! Stored records reference ingredients by whatever shape was current when
//! they were written: a canonical surrogate key, an opaque numeric legacy
//! key, or the free-text ingredient name. Every shape is classified into
//! [`IngredientRef`] once, at the edge, and resolved only through the
//! identity normalizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of a hyphenated UUID, the only accepted canonical key shape.
const CANONICAL_KEY_LEN: usize = 36;

/// Permanent surrogate identifier of one live ingredient concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Mint a fresh key for a newly curated ingredient.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept `raw` only if it has canonical-key shape. Case is folded so
    /// that `A1B2...` and `a1b2...` denote the same key.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if has_canonical_shape(trimmed) {
            Some(Self(trimmed.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters of the key, used in operator-facing output.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check for the fixed surrogate format (hyphenated UUID).
pub fn has_canonical_shape(raw: &str) -> bool {
    raw.len() == CANONICAL_KEY_LEN && Uuid::parse_str(raw).is_ok()
}

/// One historical identifier, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum IngredientRef {
    Canonical(CanonicalKey),
    Legacy(i64),
    NameText(String),
}

impl IngredientRef {
    /// Classify a raw stored identifier by its shape.
    ///
    /// Canonical shape wins, then all-digit strings that fit an `i64`;
    /// everything else is treated as a name.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(key) = CanonicalKey::parse(trimmed) {
            return IngredientRef::Canonical(key);
        }
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = trimmed.parse::<i64>() {
                return IngredientRef::Legacy(number);
            }
        }
        IngredientRef::NameText(trimmed.to_string())
    }

    /// Human-readable shape tag for reports.
    pub fn shape(&self) -> &'static str {
        match self {
            IngredientRef::Canonical(_) => "canonical",
            IngredientRef::Legacy(_) => "legacy",
            IngredientRef::NameText(_) => "name",
        }
    }
}

impl From<&str> for IngredientRef {
    fn from(raw: &str) -> Self {
        IngredientRef::classify(raw)
    }
}

impl From<CanonicalKey> for IngredientRef {
    fn from(key: CanonicalKey) -> Self {
        IngredientRef::Canonical(key)
    }
}

impl fmt::Display for IngredientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngredientRef::Canonical(key) => write!(f, "{key}"),
            IngredientRef::Legacy(number) => write!(f, "{number}"),
            IngredientRef::NameText(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
#[path = "tests/ingredient_ref_tests.rs"]
mod tests;
