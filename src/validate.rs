//! Input validation.
//!
//! - Spreadsheet header names and model names must be plain identifiers
//! - `--after` cutoffs accept epoch milliseconds or RFC 3339 timestamps
//! - Unknown model and environment names get "did you mean" suggestions

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;

use crate::error::{Error, Result};

// ── Identifiers ──────────────────────────────────────────────

/// Letter first, then letters, digits, `_` or `-`.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("IDENTIFIER is a valid regex pattern")
});

/// Whether `name` is usable as a field or model name.
///
/// Names starting with `_` are store bookkeeping and never accepted.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Validate a model name given on the command line.
///
/// # Errors
///
/// Returns `InvalidArgument` if `name` is not an identifier.
pub fn model_name(name: &str) -> Result<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(Error::InvalidArgument(format!("'{name}' is not a valid model name")))
    }
}

// ── Timestamps ───────────────────────────────────────────────

/// Parse a modified-after cutoff into epoch milliseconds.
///
/// Accepts a bare integer (already milliseconds) or an RFC 3339 timestamp
/// such as `2024-05-01T00:00:00Z`.
///
/// # Errors
///
/// Returns `InvalidArgument` for anything else.
pub fn parse_timestamp(input: &str) -> Result<i64> {
    let input = input.trim();
    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| {
            Error::InvalidArgument(format!(
                "'{input}' is not a timestamp (use epoch milliseconds or RFC 3339)"
            ))
        })
}

// ── Suggestions ──────────────────────────────────────────────

/// Levenshtein edit distance, case-insensitive.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// The candidate closest to `input`, if any is within three edits.
#[must_use]
pub fn closest<'a>(input: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (edit_distance(input, c), c.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("id"));
        assert!(is_identifier("first-name"));
        assert!(is_identifier("Todo_2"));
        assert!(!is_identifier("_internal"));
        assert!(!is_identifier("2fa"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("Todo").unwrap(), "Todo");
        assert!(matches!(model_name("../etc"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1000").unwrap(), 1000);
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z").unwrap(), 1000);
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00+00:00").unwrap(),
            1_704_067_200_000
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("todo", "Todo"), 0);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_closest() {
        let models = vec!["Todo".to_string(), "Category".to_string()];
        assert_eq!(closest("Tood", &models), Some("Todo"));
        assert_eq!(closest("Catgory", &models), Some("Category"));
        assert_eq!(closest("Invoice", &models), None);
    }
}
