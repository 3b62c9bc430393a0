//! JSON-file backed persistent store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, instrument};

use super::{KeyValueStore, StorageError};

/// File name used inside the data directory.
pub const STORE_FILE_NAME: &str = "local_storage.json";

/// Persistent store holding a flat JSON object of string values.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact. The
/// in-process lock serializes read-modify-write cycles; separate processes
/// sharing one file are not coordinated.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota_bytes: Option<u64>,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (lazily) the store file `local_storage.json` inside `data_dir`.
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORE_FILE_NAME))
    }

    /// Opens (lazily) the store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
            lock: Mutex::new(()),
        }
    }

    /// Limits the serialized store size; writes beyond it fail with
    /// [`StorageError::QuotaExceeded`].
    #[must_use]
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::corrupt(&self.path, e))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let serialized =
            serde_json::to_string_pretty(map).map_err(|e| StorageError::corrupt(&self.path, e))?;

        if let Some(quota) = self.quota_bytes {
            let required = serialized.len() as u64;
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).map_err(|e| StorageError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display(), bytes = value.len()))]
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        debug!("stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
