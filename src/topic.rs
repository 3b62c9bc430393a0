//! Topic normalization shared by navigation and random selection.
//!
//! Topics are free text. Two topics are considered the same when their
//! trimmed forms compare equal ignoring case.

/// Trims a raw topic, returning `None` when nothing is left.
///
/// # Examples
///
/// ```
/// use genwiki_core::topic::normalize_topic;
///
/// assert_eq!(normalize_topic("  Entropy "), Some("Entropy".to_string()));
/// assert_eq!(normalize_topic("   "), None);
/// ```
#[must_use]
pub fn normalize_topic(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Returns true when both topics are equal after trimming, ignoring case.
///
/// Uses Unicode lowercasing so non-ASCII topics (`Équilibre`, `Ωmega`)
/// compare the way a reader expects.
///
/// ```
/// use genwiki_core::topic::same_topic;
///
/// assert!(same_topic("Balance", " balance"));
/// assert!(!same_topic("Balance", "Harmony"));
/// ```
#[must_use]
pub fn same_topic(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.to_lowercase() == b.to_lowercase()
}
