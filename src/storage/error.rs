//! Error types for the storage module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`KeyValueStore`](super::KeyValueStore) implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage was turned off for this session.
    #[error("storage is disabled")]
    Disabled,

    /// Writing the value would exceed the configured quota.
    #[error("storage quota exceeded: {required} bytes needed, quota is {quota} bytes")]
    QuotaExceeded {
        /// Size of the serialized store after the write.
        required: u64,
        /// Configured limit.
        quota: u64,
    },

    /// Filesystem error while reading or writing the store.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but does not hold a JSON object of strings.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Another task panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt-file error for `path`.
    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }
}
