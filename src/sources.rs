//! Grounding sources returned alongside generated text.
//!
//! A generation may report the same citation many times while it streams.
//! Sources are unique by URI for the lifetime of one generation, and the
//! order in which a URI first appeared is kept.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A citation returned with generated text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Link to the cited page; the deduplication key.
    pub uri: String,
    /// Page title as reported by the API (may be empty).
    pub title: String,
}

impl Source {
    /// Creates a source from a URI and title.
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }

    /// Title for display, falling back to the URI when the title is blank.
    #[must_use]
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { &self.uri } else { title }
    }
}

/// Appends the entries of `batch` whose URI has not been seen yet.
///
/// The result is `current` followed by strictly new sources in first-seen
/// order; duplicates inside `batch` itself are dropped as well.
///
/// ```
/// use genwiki_core::sources::{Source, merge_sources};
///
/// let current = vec![Source::new("https://a.example", "A")];
/// let batch = vec![
///     Source::new("https://b.example", "B"),
///     Source::new("https://a.example", "A again"),
/// ];
/// let merged = merge_sources(&current, &batch);
/// assert_eq!(merged.len(), 2);
/// assert_eq!(merged[1].uri, "https://b.example");
/// ```
#[must_use]
pub fn merge_sources(current: &[Source], batch: &[Source]) -> Vec<Source> {
    let mut seen: HashSet<&str> = current.iter().map(|s| s.uri.as_str()).collect();
    let mut merged = current.to_vec();
    for source in batch {
        if seen.insert(source.uri.as_str()) {
            merged.push(source.clone());
        }
    }
    merged
}

/// Tracks URIs already emitted during one generation stream.
#[derive(Debug, Default)]
pub struct SourceTracker {
    seen: HashSet<String>,
}

impl SourceTracker {
    /// Creates a tracker that has seen nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sources from `candidates` not emitted before, and marks them seen.
    ///
    /// Candidates with an empty URI are skipped.
    pub fn take_new(&mut self, candidates: impl IntoIterator<Item = Source>) -> Vec<Source> {
        candidates
            .into_iter()
            .filter(|source| !source.uri.trim().is_empty())
            .filter(|source| self.seen.insert(source.uri.clone()))
            .collect()
    }

    /// Number of distinct URIs seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no source has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(uri: &str) -> Source {
        Source::new(uri, format!("title of {uri}"))
    }

    #[test]
    fn test_merge_sources_adds_only_new_uris() {
        let current = vec![src("a"), src("b")];
        let batch = vec![src("b"), src("c"), src("a"), src("d")];

        let merged = merge_sources(&current, &batch);

        let uris: Vec<&str> = merged.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, ["a", "b", "c", "d"]);
        assert_eq!(merged.len(), current.len() + 2);
    }

    #[test]
    fn test_merge_sources_drops_duplicates_within_batch() {
        let merged = merge_sources(&[], &[src("x"), src("x"), src("y")]);
        let uris: Vec<&str> = merged.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, ["x", "y"]);
    }

    #[test]
    fn test_merge_sources_keeps_first_title_for_uri() {
        let current = vec![Source::new("a", "first")];
        let merged = merge_sources(&current, &[Source::new("a", "second")]);
        assert_eq!(merged, current);
    }

    #[test]
    fn test_merge_sources_empty_batch_returns_current() {
        let current = vec![src("a")];
        assert_eq!(merge_sources(&current, &[]), current);
    }

    #[test]
    fn test_source_tracker_emits_each_uri_once() {
        let mut tracker = SourceTracker::new();
        assert_eq!(tracker.take_new(vec![src("a"), src("b")]).len(), 2);
        let second = tracker.take_new(vec![src("b"), src("c")]);
        assert_eq!(second, vec![src("c")]);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_source_tracker_skips_empty_uri() {
        let mut tracker = SourceTracker::new();
        assert!(tracker.take_new(vec![Source::new(" ", "blank")]).is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_display_title_falls_back_to_uri() {
        assert_eq!(Source::new("https://x", "  ").display_title(), "https://x");
        assert_eq!(Source::new("https://x", "X").display_title(), "X");
    }
}
