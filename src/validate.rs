//! Input validation and synonym resolution for CLI arguments.
//!
//! Provides O(1) validation sets and synonym maps so users can type
//! natural words for lifecycles. Three-tier resolution: exact match →
//! synonym lookup → error with suggestion.
//!
//! Sync modes have no synonyms: REPLACE deletes endpoints, so only the
//! literal tokens `merge` and `replace` are accepted.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{ChangelogType, HttpMethod, Lifecycle, SyncMode};

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_MODES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["merge", "replace"].into_iter().collect());

pub static VALID_LIFECYCLES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["draft", "active", "deprecated"].into_iter().collect());

pub static VALID_CHANGELOG_TYPES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["added", "changed", "deprecated", "removed", "fixed"]
        .into_iter()
        .collect()
});

pub static VALID_METHODS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["get", "post", "put", "patch", "delete"]
        .into_iter()
        .collect()
});

// ── Synonym maps ─────────────────────────────────────────────

pub static LIFECYCLE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("new", "draft"),
        ("proposed", "draft"),
        ("wip", "draft"),
        ("live", "active"),
        ("published", "active"),
        ("stable", "active"),
        ("ga", "active"),
        ("retired", "deprecated"),
        ("sunset", "deprecated"),
        ("legacy", "deprecated"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a sync mode by exact, case-insensitive match.
///
/// Returns the canonical lowercase mode, or the original input with an
/// optional suggestion.
pub fn normalize_mode(input: &str) -> std::result::Result<String, (String, Option<String>)> {
    normalize(input, &VALID_MODES, &HashMap::new())
}

/// Normalize a lifecycle via exact match or synonym lookup.
pub fn normalize_lifecycle(input: &str) -> std::result::Result<String, (String, Option<String>)> {
    normalize(input, &VALID_LIFECYCLES, &LIFECYCLE_SYNONYMS)
}

fn normalize(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> std::result::Result<String, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match
    if valid.contains(lower.as_str()) {
        return Ok(lower);
    }

    // Tier 2: synonym lookup
    if let Some(&canonical) = synonyms.get(lower.as_str()) {
        return Ok(canonical.to_string());
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_match(&lower, valid, synonyms);
    Err((input.to_string(), suggestion))
}

/// Parse a sync mode argument into a [`SyncMode`].
///
/// # Errors
///
/// Returns `InvalidMode`, naming the closest valid mode when there is one.
pub fn parse_mode(input: &str) -> Result<SyncMode> {
    match normalize_mode(input) {
        Ok(mode) => mode.parse().map_err(Error::InvalidMode),
        Err((original, Some(suggestion))) => {
            Err(Error::InvalidMode(format!("{original} (did you mean '{suggestion}'?)")))
        }
        Err((original, None)) => Err(Error::InvalidMode(original)),
    }
}

/// Parse a lifecycle argument into a [`Lifecycle`].
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown lifecycle.
pub fn parse_lifecycle(input: &str) -> Result<Lifecycle> {
    match normalize_lifecycle(input) {
        Ok(lifecycle) => lifecycle.parse().map_err(Error::InvalidArgument),
        Err((original, suggestion)) => Err(Error::InvalidArgument(with_suggestion(
            format!("Unknown lifecycle '{original}'"),
            suggestion,
        ))),
    }
}

/// Parse a changelog entry type.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown type.
pub fn parse_changelog_type(input: &str) -> Result<ChangelogType> {
    match normalize(input, &VALID_CHANGELOG_TYPES, &HashMap::new()) {
        Ok(kind) => kind.parse().map_err(Error::InvalidArgument),
        Err((original, suggestion)) => Err(Error::InvalidArgument(with_suggestion(
            format!("Unknown changelog type '{original}'"),
            suggestion,
        ))),
    }
}

/// Parse an HTTP method argument into an [`HttpMethod`].
///
/// # Errors
///
/// Returns `InvalidArgument` for methods the registry does not track.
pub fn parse_method(input: &str) -> Result<HttpMethod> {
    let lower = input.trim().to_lowercase();
    if VALID_METHODS.contains(lower.as_str()) {
        return lower.parse().map_err(Error::InvalidArgument);
    }

    let suggestion = find_closest_match(&lower, &VALID_METHODS, &HashMap::new())
        .map(|m| m.to_uppercase());
    Err(Error::InvalidArgument(with_suggestion(
        format!("Unsupported HTTP method '{input}'"),
        suggestion,
    )))
}

/// Validate an endpoint path: must start with `/`.
///
/// # Errors
///
/// Returns `InvalidArgument` for an empty or relative path.
pub fn validate_path(path: &str) -> Result<&str> {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        Ok(trimmed)
    } else {
        Err(Error::InvalidArgument(format!(
            "Endpoint path must start with '/': '{path}'"
        )))
    }
}

fn with_suggestion(message: String, suggestion: Option<String>) -> String {
    match suggestion {
        Some(s) => format!("{message} (did you mean '{s}'?)"),
        None => message,
    }
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
