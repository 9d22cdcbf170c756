//! Identifier resolution.
//!
//! Resolution order, first match wins:
//! 1. canonical-key shape, accepted only when the key is live
//! 2. known legacy numeric key
//! 3. free-text name after [`normalize_name`]
//!
//! The order prefers the most structurally specific match so that a name
//! collision can never shadow an exact key.

use super::map_builder::{IdentityMap, IngredientSummary};
use crate::types::errors::ResolveError;
use crate::types::{CanonicalKey, IngredientRef};
use deunicode::deunicode;
use regex::Regex;
use std::sync::LazyLock;

/// Everything except letters, digits and separators.
static RE_NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s_-]").expect("Invalid regex"));

/// Runs of separators.
static RE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("Invalid regex"));

/// Fold a display name into the fuzzy join key.
///
/// Transliterates to ASCII, lowercases, drops punctuation, and collapses
/// every run of spaces, hyphens and underscores into one space.
pub fn normalize_name(text: &str) -> String {
    let latin = deunicode(text).to_lowercase();
    let stripped = RE_NON_ALNUM.replace_all(&latin, "");
    RE_SEPARATORS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

impl IdentityMap {
    /// Resolve one identifier to exactly one live canonical key.
    pub fn normalize(&self, identifier: &IngredientRef) -> Result<CanonicalKey, ResolveError> {
        match identifier {
            IngredientRef::Canonical(key) => self.resolve_canonical(key),
            IngredientRef::Legacy(number) => {
                if let Some(key) = self.legacy_to_canonical.get(number) {
                    return Ok(key.clone());
                }
                if let Some(keys) = self.rows_by_legacy.get(number) {
                    if keys.len() > 1 {
                        return Err(ResolveError::AmbiguousName {
                            name: number.to_string(),
                            candidates: keys.iter().map(|k| k.to_string()).collect(),
                        });
                    }
                }
                // Digits that are not a known legacy key may still be a name.
                self.resolve_name(&number.to_string())
            }
            IngredientRef::NameText(text) => self.resolve_name(text),
        }
    }

    /// Classify and resolve a raw stored identifier.
    pub fn normalize_raw(&self, raw: &str) -> Result<CanonicalKey, ResolveError> {
        self.normalize(&IngredientRef::classify(raw))
    }

    /// Resolve a merge candidate to every live row it denotes.
    ///
    /// Unlike [`IdentityMap::normalize`], a name shared by several live rows
    /// yields all of them instead of an error: that collision is exactly
    /// what a merge is for.
    pub fn resolve_candidates(&self, raw: &str) -> Result<Vec<CanonicalKey>, ResolveError> {
        match self.normalize_raw(raw) {
            Ok(key) => Ok(vec![key]),
            Err(ResolveError::AmbiguousName { name, .. }) => {
                let keys = name
                    .parse::<i64>()
                    .ok()
                    .and_then(|legacy| self.rows_by_legacy.get(&legacy))
                    .or_else(|| self.rows_by_name.get(&normalize_name(&name)))
                    .cloned()
                    .unwrap_or_default();
                if keys.is_empty() {
                    Err(ResolveError::UnresolvedIdentifier { identifier: name })
                } else {
                    Ok(keys)
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Resolve and return the catalog facts for the key.
    pub fn lookup(&self, raw: &str) -> Result<&IngredientSummary, ResolveError> {
        let key = self.normalize_raw(raw)?;
        self.live
            .get(&key)
            .ok_or(ResolveError::UnresolvedIdentifier {
                identifier: raw.to_string(),
            })
    }

    fn resolve_canonical(&self, key: &CanonicalKey) -> Result<CanonicalKey, ResolveError> {
        if self.live.contains_key(key) {
            return Ok(key.clone());
        }
        Err(ResolveError::OrphanedCanonicalKey {
            key: key.to_string(),
            retired_into: self.retired.get(key).map(|survivor| survivor.to_string()),
        })
    }

    fn resolve_name(&self, text: &str) -> Result<CanonicalKey, ResolveError> {
        let normalized = normalize_name(text);
        if normalized.is_empty() {
            return Err(ResolveError::UnresolvedIdentifier {
                identifier: text.to_string(),
            });
        }
        if let Some(key) = self.name_to_canonical.get(&normalized) {
            return Ok(key.clone());
        }
        match self.rows_by_name.get(&normalized) {
            Some(keys) if keys.len() > 1 => Err(ResolveError::AmbiguousName {
                name: text.to_string(),
                candidates: keys.iter().map(|k| k.to_string()).collect(),
            }),
            _ => Err(ResolveError::UnresolvedIdentifier {
                identifier: text.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/normalizer_tests.rs"]
mod tests;
