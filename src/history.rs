//! Bounded back/forward navigation history of visited topics.
//!
//! [`History`] behaves like a browser history capped at [`HISTORY_CAP`]
//! entries: navigating to a new topic drops any forward entries, appends the
//! topic and evicts the oldest entry once the cap is exceeded. Jumping to an
//! earlier entry only moves the index, so forward entries survive until the
//! next navigation.
//!
//! # Example
//!
//! ```
//! use genwiki_core::history::{History, NavigateOutcome};
//!
//! let mut history = History::new();
//! history.navigate("Balance").unwrap();
//! history.navigate("Harmony").unwrap();
//!
//! // Comparing against the current topic only, case-insensitively.
//! assert_eq!(history.navigate(" harmony ").unwrap(), NavigateOutcome::Unchanged);
//! assert_eq!(history.current(), Some("Harmony"));
//! ```

use thiserror::Error;
use tracing::debug;

use crate::topic::{normalize_topic, same_topic};

/// Maximum number of topics kept in history.
pub const HISTORY_CAP: usize = 16;

/// Errors returned by history operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// The topic was empty after trimming.
    #[error("topic must not be blank")]
    BlankTopic,

    /// A jump targeted an index that does not exist.
    #[error("history index {index} out of range (history has {len} entries)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of entries at the time of the request.
        len: usize,
    },
}

/// Result of a [`History::navigate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigateOutcome {
    /// The topic matched the current one; nothing changed.
    Unchanged,
    /// The topic was appended and is now current.
    Appended {
        /// Oldest topic dropped to respect the cap, if any.
        evicted: Option<String>,
    },
}

impl NavigateOutcome {
    /// Returns true when the history changed.
    #[must_use]
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended { .. })
    }
}

/// Ordered list of visited topics with a current position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    /// Index of the current entry; `None` only while history is empty.
    index: Option<usize>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigates to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::BlankTopic`] when the topic is blank.
    pub fn navigate(&mut self, topic: &str) -> Result<NavigateOutcome, HistoryError> {
        let topic = normalize_topic(topic).ok_or(HistoryError::BlankTopic)?;

        if self.current().is_some_and(|current| same_topic(current, &topic)) {
            debug!(topic = %topic, "navigation to current topic ignored");
            return Ok(NavigateOutcome::Unchanged);
        }

        if let Some(index) = self.index {
            self.entries.truncate(index + 1);
        }
        self.entries.push(topic);

        let evicted = if self.entries.len() > HISTORY_CAP {
            Some(self.entries.remove(0))
        } else {
            None
        };

        self.index = Some(self.entries.len() - 1);
        debug!(
            len = self.entries.len(),
            evicted = evicted.as_deref().unwrap_or(""),
            "navigated to new topic"
        );
        Ok(NavigateOutcome::Appended { evicted })
    }

    /// Jumps directly to `index` without truncating forward entries.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::IndexOutOfRange`] when `index` has no entry.
    pub fn go_to(&mut self, index: usize) -> Result<&str, HistoryError> {
        if index >= self.entries.len() {
            return Err(HistoryError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        self.index = Some(index);
        Ok(&self.entries[index])
    }

    /// Moves one entry back. Returns the new current topic, or `None` at the start.
    pub fn back(&mut self) -> Option<&str> {
        let index = self.index?.checked_sub(1)?;
        self.index = Some(index);
        Some(&self.entries[index])
    }

    /// Moves one entry forward. Returns the new current topic, or `None` at the end.
    pub fn forward(&mut self) -> Option<&str> {
        let index = self.index? + 1;
        if index >= self.entries.len() {
            return None;
        }
        self.index = Some(index);
        Some(&self.entries[index])
    }

    /// Current topic, if any.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.index.map(|index| self.entries[index].as_str())
    }

    /// Index of the current topic, if any.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been visited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
