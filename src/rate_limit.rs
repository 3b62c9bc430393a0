//! Rolling one-hour rate limits for outbound feedback and search logging.
//!
//! Each limited action keeps a JSON array of epoch-millisecond timestamps in
//! a [`KeyValueStore`]. A check prunes entries older than an hour, refuses
//! the action when the window is already full and otherwise records `now`.
//!
//! The limit is best-effort: when the store cannot be read, parsed or
//! written, the action is allowed. That path is reported as
//! [`Admission::Unenforced`] and logged on its own so it can be told apart
//! from a successful check.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use genwiki_core::rate_limit::{Admission, WindowRateLimiter};
//! use genwiki_core::storage::MemoryStore;
//!
//! let limiter = WindowRateLimiter::new(Arc::new(MemoryStore::new()));
//! let admission = limiter.check_and_record("demo", 2, "demo actions").unwrap();
//! assert_eq!(admission, Admission::Recorded { remaining: 1 });
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Length of the rolling window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Maximum feedback submissions per rolling hour.
pub const MAX_FEEDBACK_SUBMISSIONS_PER_HOUR: usize = 5;
/// Storage key for feedback submission timestamps.
pub const FEEDBACK_STORAGE_KEY: &str = "feedbackSubmissions";

/// Maximum search log events per rolling hour.
pub const MAX_SEARCH_LOGS_PER_HOUR: usize = 100;
/// Storage key for search log timestamps.
pub const SEARCH_LOG_STORAGE_KEY: &str = "searchLogSubmissions";

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

/// The rolling window for an action is full.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Rate limit for {label} exceeded. Please try again later. You can submit {max_per_hour} times per hour."
)]
pub struct RateLimitExceeded {
    /// Human readable action name, e.g. `feedback`.
    pub label: String,
    /// Configured hourly maximum.
    pub max_per_hour: usize,
}

/// Result of an admitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The action was counted; `remaining` more fit in the current window.
    Recorded {
        remaining: usize,
    },
    /// Storage failed, so the limit could not be enforced and the action is allowed.
    Unenforced {
        /// Description of the storage failure.
        reason: String,
    },
}

/// Sliding-window limiter backed by a key-value store.
#[derive(Clone)]
pub struct WindowRateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for WindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRateLimiter").finish_non_exhaustive()
    }
}

impl WindowRateLimiter {
    /// Creates a limiter using the wall clock.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a limiter with an explicit clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Checks the window for `key` and records the action when there is room.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded`] when `max_per_hour` actions were already
    /// recorded within the last hour. Storage failures never produce an error.
    #[instrument(skip(self), fields(key = %key))]
    pub fn check_and_record(
        &self,
        key: &str,
        max_per_hour: usize,
        label: &str,
    ) -> Result<Admission, RateLimitExceeded> {
        let now = self.clock.now_millis();

        let timestamps = match self.load_window(key, now) {
            Ok(timestamps) => timestamps,
            Err(reason) => return Ok(unenforced(label, reason)),
        };

        if timestamps.len() >= max_per_hour {
            debug!(count = timestamps.len(), max_per_hour, "rate limit exceeded");
            return Err(RateLimitExceeded {
                label: label.to_string(),
                max_per_hour,
            });
        }

        let mut timestamps = timestamps;
        timestamps.push(now);
        if let Err(reason) = self.save_window(key, &timestamps) {
            return Ok(unenforced(label, reason));
        }

        let remaining = max_per_hour - timestamps.len();
        debug!(count = timestamps.len(), remaining, "action recorded");
        Ok(Admission::Recorded { remaining })
    }

    /// Number of actions recorded for `key` within the current window.
    ///
    /// Storage failures read as an empty window.
    #[must_use]
    pub fn recorded_in_window(&self, key: &str) -> usize {
        self.load_window(key, self.clock.now_millis())
            .map_or(0, |timestamps| timestamps.len())
    }

    fn load_window(&self, key: &str, now: i64) -> Result<Vec<i64>, String> {
        let stored = self.store.get(key).map_err(|e| e.to_string())?;
        let timestamps: Vec<i64> = match stored {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| format!("stored window for '{key}' is not a timestamp list: {e}"))?,
            None => Vec::new(),
        };
        let window_ms = i64::try_from(RATE_WINDOW.as_millis()).unwrap_or(i64::MAX);
        Ok(timestamps
            .into_iter()
            .filter(|ts| now.saturating_sub(*ts) < window_ms)
            .collect())
    }

    fn save_window(&self, key: &str, timestamps: &[i64]) -> Result<(), String> {
        let serialized = serde_json::to_string(timestamps).map_err(|e| e.to_string())?;
        self.store
            .set(key, &serialized)
            .map_err(|e: StorageError| e.to_string())
    }
}

fn unenforced(label: &str, reason: String) -> Admission {
    warn!(
        limit = label,
        reason = %reason,
        "rate limit not enforced: storage unavailable, allowing action"
    );
    Admission::Unenforced { reason }
}
