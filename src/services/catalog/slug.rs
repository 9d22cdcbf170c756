use deunicode::deunicode;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static RE_SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("Invalid regex"));

static RE_SLUG_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("Invalid regex"));

static RE_SLUG_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid regex"));

/// URL slug for a recipe name: "Tommy's Margarita" -> "tommys-margarita".
pub fn create_slug(name: &str) -> String {
    let lower = deunicode(name).to_lowercase();
    let stripped = RE_SLUG_STRIP.replace_all(&lower, "");
    RE_SLUG_SPACES
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string()
}

/// Append `-<id>` when `slug` is already taken, and claim the result.
pub fn claim_unique_slug(slug: String, id: &str, taken: &mut HashSet<String>) -> String {
    let unique = if taken.contains(&slug) {
        let renamed = format!("{slug}-{}", create_slug(id));
        log::warn!("Duplicate slug '{slug}' renamed to '{renamed}'");
        renamed
    } else {
        slug
    };
    taken.insert(unique.clone());
    unique
}

/// Problems with one slug, split into (errors, warnings).
pub fn check_slug(slug: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if slug.is_empty() {
        errors.push("Empty slug".to_string());
        return (errors, warnings);
    }
    if slug != slug.to_lowercase() {
        errors.push(format!("Slug '{slug}' contains uppercase letters"));
    }
    if !RE_SLUG_SAFE.is_match(slug) {
        errors.push(format!(
            "Slug '{slug}' is not URL-safe (use only lowercase letters, numbers, and hyphens)"
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        errors.push(format!("Slug '{slug}' has leading or trailing hyphens"));
    }
    if slug.contains("--") {
        warnings.push(format!("Slug '{slug}' contains consecutive hyphens"));
    }
    (errors, warnings)
}

#[cfg(test)]
#[path = "tests/slug_tests.rs"]
mod tests;
