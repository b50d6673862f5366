//! Input normalisation for roles and assessment types.
//!
//! Three-tier resolution: exact match → synonym lookup → error with the
//! closest suggestion. Field values are otherwise passed through untouched;
//! a value containing the table delimiter is reported, never rewritten.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::Role;

// ── Valid value sets ─────────────────────────────────────────

pub static VALID_ROLES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["student", "lecturer", "leader", "admin"]
        .into_iter()
        .collect()
});

pub static VALID_ASSESSMENT_TYPES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["exam", "assignment", "quiz", "project", "presentation"]
        .into_iter()
        .collect()
});

// ── Synonym maps ─────────────────────────────────────────────

pub static ROLE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("pupil", "student"),
        ("learner", "student"),
        ("teacher", "lecturer"),
        ("tutor", "lecturer"),
        ("instructor", "lecturer"),
        ("academic_leader", "leader"),
        ("academic-leader", "leader"),
        ("academicleader", "leader"),
        ("coordinator", "leader"),
        ("administrator", "admin"),
        ("root", "admin"),
    ]
    .into_iter()
    .collect()
});

pub static ASSESSMENT_TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("test", "exam"),
        ("final", "exam"),
        ("midterm", "exam"),
        ("examination", "exam"),
        ("coursework", "assignment"),
        ("homework", "assignment"),
        ("essay", "assignment"),
        ("report", "assignment"),
        ("mcq", "quiz"),
        ("capstone", "project"),
        ("group_project", "project"),
        ("demo", "presentation"),
        ("viva", "presentation"),
        ("talk", "presentation"),
    ]
    .into_iter()
    .collect()
});

fn resolve(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> std::result::Result<String, Option<String>> {
    let lower = input.trim().to_lowercase();

    if valid.contains(lower.as_str()) {
        return Ok(lower);
    }
    if let Some(&canonical) = synonyms.get(lower.as_str()) {
        return Ok(canonical.to_string());
    }
    Err(find_closest_match(&lower, valid, synonyms))
}

/// Normalise a role given on the command line.
///
/// # Errors
///
/// Returns `Error::InvalidRole` with the closest valid role, if any.
pub fn normalize_role(input: &str) -> Result<Role> {
    resolve(input, &VALID_ROLES, &ROLE_SYNONYMS)
        .map(|canonical| Role::parse(&canonical))
        .map_err(|suggestion| Error::InvalidRole {
            input: input.to_string(),
            suggestion: suggestion.map(|s| s.to_uppercase()),
        })
}

/// Normalise an assessment type to its stored upper-case form.
///
/// # Errors
///
/// Returns `Error::InvalidAssessmentType` with the closest valid type, if any.
pub fn normalize_assessment_type(input: &str) -> Result<String> {
    resolve(input, &VALID_ASSESSMENT_TYPES, &ASSESSMENT_TYPE_SYNONYMS)
        .map(|canonical| canonical.to_uppercase())
        .map_err(|suggestion| Error::InvalidAssessmentType {
            input: input.to_string(),
            suggestion: suggestion.map(|s| s.to_uppercase()),
        })
}

/// Whether `value` contains the table delimiter. Such a row is written as
/// given and will not decode on the next read.
pub fn contains_delimiter(field: &str, value: &str, delimiter: char) -> bool {
    if value.contains(delimiter) {
        warn!(field, %delimiter, "Value contains the table delimiter; the row will not read back");
        return true;
    }
    false
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
        if dist > 3 || best.is_some_and(|(_, d)| dist >= d) {
            continue;
        }
        // Synonyms suggest what they map to
        let canonical = synonyms.get(v).copied().unwrap_or(v);
        best = Some((canonical, dist));
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Existing ids within edit distance 3 of `searched`, closest first.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let searched = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(&searched, &id.to_lowercase()), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role("leader").unwrap(), Role::Leader);
        assert_eq!(normalize_role("Academic_Leader").unwrap(), Role::Leader);
        assert_eq!(normalize_role("tutor").unwrap(), Role::Lecturer);
        assert_eq!(normalize_role(" ADMIN ").unwrap(), Role::Admin);
    }

    #[test]
    fn test_role_typo_suggests() {
        match normalize_role("lectuer") {
            Err(Error::InvalidRole { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("LECTURER"));
            }
            other => panic!("expected InvalidRole, got {other:?}"),
        }
        assert!(matches!(
            normalize_role("zzzzzzzzzz"),
            Err(Error::InvalidRole { suggestion: None, .. })
        ));
    }

    #[test]
    fn test_normalize_assessment_type() {
        assert_eq!(normalize_assessment_type("quiz").unwrap(), "QUIZ");
        assert_eq!(normalize_assessment_type("coursework").unwrap(), "ASSIGNMENT");
        assert_eq!(normalize_assessment_type("Midterm").unwrap(), "EXAM");
        assert!(matches!(
            normalize_assessment_type("projcet"),
            Err(Error::InvalidAssessmentType { suggestion: Some(s), .. }) if s == "PROJECT"
        ));
    }

    #[test]
    fn test_delimiter_is_reported_not_rewritten() {
        assert!(contains_delimiter("title", "Lab|B", '|'));
        assert!(!contains_delimiter("title", "Lab B", '|'));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_ids() {
        let ids = vec!["M001".to_string(), "M002".to_string(), "X-LONG-ID".to_string()];
        let result = find_similar_ids("m003", &ids, 3);
        assert_eq!(result, ["M001", "M002"]);
    }
}
