//! Column name canonicalization
//!
//! Vendor exports spell the same measurement many ways (`PM2.5 µg/m3`,
//! `pm2.5`, `Temp (°C)`). Every header is reduced to a lowercase,
//! underscore-separated, unit-free key before any matching happens.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static MICROGRAM_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[µμu]g/?m3").expect("unit pattern is valid"));

/// Produce the canonical key for a raw header string
pub fn canonicalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let underscored = WHITESPACE.replace_all(&lowered, "_");
    let mut key: String = underscored
        .chars()
        .filter(|c| !matches!(c, '%' | '°'))
        .collect();

    // Removing one unit can splice together another, so strip to a fixpoint
    while MICROGRAM_UNIT.is_match(&key) {
        key = MICROGRAM_UNIT.replace_all(&key, "").into_owned();
    }

    key
}

/// Split a canonical key into alphanumeric tokens.
///
/// Parentheses are dropped before splitting, so `temp(c)` is the single
/// token `tempc`.
pub fn tokenize(key: &str) -> Vec<String> {
    let stripped: String = key.chars().filter(|c| !matches!(c, '(' | ')')).collect();

    stripped
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
