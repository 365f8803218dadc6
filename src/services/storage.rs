//! Durable key-value storage backends.
//!
//! The core only ever talks to a [`KeyValueStore`]: last-write-wins, no
//! transactions, values are JSON. [`JsonFileStore`] persists to a single JSON
//! file and writes through on every modification; a failed write leaves the
//! in-memory map as it was. [`MemoryStore`] keeps everything in process and
//! is what tests and ephemeral sessions use.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use crate::error::{JumpError, JumpResult};

/// A durable key-value store shared by every cache in a context.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written.
    fn get(&self, key: &str) -> JumpResult<Option<Value>>;

    /// Write a value, replacing whatever was stored.
    fn set(&self, key: &str, value: Value) -> JumpResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> JumpResult<()>;

    /// All keys currently stored.
    fn keys(&self) -> JumpResult<Vec<String>>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> JumpResult<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> JumpResult<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> JumpResult<()> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn keys(&self) -> JumpResult<Vec<String>> {
        Ok(lock(&self.values).keys().cloned().collect())
    }
}

/// Key-value storage backed by a JSON file.
///
/// The whole map is held in memory and rewritten to disk on every
/// modification.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// Open a store at `path`.
    ///
    /// A missing file starts empty. A corrupted file is an error rather than
    /// silently discarded data.
    pub fn open(path: impl AsRef<Path>) -> JumpResult<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), keys = values.len(), "opened store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, Value>) -> JumpResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                JumpError::Storage(format!(
                    "Failed to create storage directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Atomic write: temp file, then rename over the store.
        let contents = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| {
            JumpError::Storage(format!(
                "Failed to write store '{}': {}",
                tmp_path.display(),
                e
            ))
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            JumpError::Storage(format!(
                "Failed to replace store '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> JumpResult<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> JumpResult<()> {
        let mut values = lock(&self.values);
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.flush(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> JumpResult<()> {
        let mut values = lock(&self.values);
        let Some(removed) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&values) {
            values.insert(key.to_string(), removed);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> JumpResult<Vec<String>> {
        Ok(lock(&self.values).keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        store.set("key1", json!("value1")).unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(json!("value1")));
        assert_eq!(store.get("nonexistent").unwrap(), None);

        store.remove("key1").unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
        store.remove("key1").unwrap();
    }

    #[test]
    fn test_file_store_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store
                .set("complex", json!({"nested": {"array": [1, 2, 3]}}))
                .unwrap();
            store.set("count", json!(42)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("count").unwrap(), Some(json!(42)));
        assert_eq!(
            store.get("complex").unwrap(),
            Some(json!({"nested": {"array": [1, 2, 3]}}))
        );
    }

    #[test]
    fn test_file_store_remove_and_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("store.json")).unwrap();

        store.set("a", json!(1)).unwrap();
        store.set("b", json!(2)).unwrap();
        store.remove("a").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["b"]);

        let reopened = JsonFileStore::open(store.path()).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("a", json!(1)).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"a": 1}));
    }

    #[test]
    fn test_failed_flush_rolls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("a", json!(1)).unwrap();

        // A directory where the temp file goes makes every write fail.
        fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(matches!(store.set("a", json!(2)), Err(JumpError::Storage(_))));
        assert!(store.set("b", json!(3)).is_err());
        assert!(store.remove("a").is_err());

        assert_eq!(store.get("a").unwrap(), Some(json!(1)));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(
            JsonFileStore::open(&path).unwrap().get("a").unwrap(),
            Some(json!(1))
        );
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(JumpError::Json(_))));
    }
}
