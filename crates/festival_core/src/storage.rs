use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub const FAVORITES_KEY: &str = "favorites";
pub const PERMISSION_DISMISSED_KEY: &str = "notification_permission_dismissed";
pub const CURATED_SCHEDULED_KEY: &str = "scheduled_curated_notifications";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable string key-value storage owned by the client session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Volatile store, used when no durable location is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.lock().insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores every key in one JSON object on disk. Each `set` rewrites the file
/// through a temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "state file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let payload = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Encode {
            key: "*".to_string(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, payload).map_err(|source| StorageError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }
}

/// Reads a JSON value. A failed read or an unparsable blob yields the default,
/// and the key is rewritten with that default.
pub fn load_json<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            tracing::warn!(key, %err, "storage read failed, using default");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, %err, "stored value is corrupt, resetting");
            let fallback = T::default();
            if let Err(err) = save_json(store, key, &fallback) {
                tracing::error!(key, %err, "failed to reset corrupt key");
            }
            fallback
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    #[test]
    fn corrupt_value_resets_to_default() {
        let store = MemoryStore::new().with_entry(FAVORITES_KEY, "{not json");
        let loaded: BTreeSet<String> = load_json(&store, FAVORITES_KEY);
        assert!(loaded.is_empty());
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn missing_value_is_default_without_write() {
        let store = MemoryStore::new();
        let flag: bool = load_json(&store, PERMISSION_DISMISSED_KEY);
        assert!(!flag);
        assert!(store.get(PERMISSION_DISMISSED_KEY).unwrap().is_none());
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::open(&path).expect("open store");
        save_json(&store, FAVORITES_KEY, &vec!["a", "b"]).expect("save");
        drop(store);

        let reopened = JsonFileStore::open(&path).expect("reopen store");
        let loaded: Vec<String> = load_json(&reopened, FAVORITES_KEY);
        assert_eq!(loaded, vec!["a".to_string(), "b".to_string()]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn json_file_store_tolerates_corrupt_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "garbage").expect("write fixture");

        let store = JsonFileStore::open(&path).expect("open store");
        assert!(store.get(FAVORITES_KEY).unwrap().is_none());
        store.set(FAVORITES_KEY, "[]").expect("set");
        let raw = fs::read_to_string(&path).expect("read back");
        assert!(raw.contains(FAVORITES_KEY));
    }

    #[test]
    fn json_file_store_tolerates_non_utf8_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, [0x7b, 0xff, 0xfe, 0x7d]).expect("write fixture");

        let store = JsonFileStore::open(&path).expect("open store");
        assert!(store.entries.lock().is_empty());
        let favorites: Vec<String> = load_json(&store, FAVORITES_KEY);
        assert!(favorites.is_empty());
    }
}
