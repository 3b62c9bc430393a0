//! Small key-value stores for persisted client state.
//!
//! Three stores share the [`KeyValueStore`] contract:
//!
//! - [`FileStore`] - survives restarts; holds preferences and rate-limit windows
//! - [`MemoryStore`] - lives for one process; caches the geolocation lookup
//! - [`DisabledStore`] - rejects every call; used when persistence is turned off
//!
//! Values are opaque strings. Callers serialize with `serde_json` and are
//! expected to treat every [`StorageError`] as non-fatal.

mod error;
mod file;
mod memory;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::{DisabledStore, MemoryStore};

/// Storage key holding the theme preference.
pub const THEME_KEY: &str = "theme";
/// Storage key holding the language preference.
pub const LANGUAGE_KEY: &str = "language";
/// Session storage key holding the cached geolocation lookup.
pub const GEOLOCATION_CACHE_KEY: &str = "geolocationData";

/// Synchronous string key-value storage.
///
/// Implementations must be safe to share between tasks.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be updated.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
