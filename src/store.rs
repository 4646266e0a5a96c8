//! store - key-value persistence for the assistant's record collections
//!
//! Every manager reads a whole collection, mutates it in memory and writes the
//! whole collection back under a single key. Two backends:
//! - `MemoryStore`: process-local, used by tests and the browser-style mode
//! - `JsonFileStore`: one `<key>.json` file per key under a data directory

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const NOTES_KEY: &str = "buddy_notes";
pub const EVENTS_KEY: &str = "buddy_calendar_events";
pub const PREFERENCES_KEY: &str = "buddy_preferences";
pub const INTERACTIONS_KEY: &str = "buddy_interactions";
pub const COMMAND_HISTORY_KEY: &str = "buddy_command_history";

/// Named JSON blob storage. No transactions, no queries.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store: `<dir>/<key>.json`
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write of the same file
    _lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).context("Failed to create data directory")
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            ._lock
            .lock()
            .map_err(|_| anyhow::anyhow!("file store lock poisoned"))?;

        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read store file: {:?}", path))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            ._lock
            .lock()
            .map_err(|_| anyhow::anyhow!("file store lock poisoned"))?;

        self.ensure_dir()?;
        let path = self.path_for(key);
        fs::write(&path, value).context(format!("Failed to write store file: {:?}", path))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self
            ._lock
            .lock()
            .map_err(|_| anyhow::anyhow!("file store lock poisoned"))?;

        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).context(format!("Failed to remove store file: {:?}", path))?;
        }
        Ok(())
    }
}

/// Load a JSON array stored under `key`.
///
/// A missing key yields an empty collection. Unparseable content is logged and
/// also treated as empty, so one corrupt blob never takes the assistant down.
pub fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unparseable stored collection");
            Ok(Vec::new())
        }
    }
}

/// Serialize `items` and write them back under `key`.
pub fn save_collection<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)
        .context(format!("Failed to serialize collection {}", key))?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_corrupt_collection_is_empty() {
        let store = MemoryStore::new();
        store.set(NOTES_KEY, "{not json").unwrap();
        let items: Vec<u32> = load_collection(&store, NOTES_KEY).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("data"));

        save_collection(&store, EVENTS_KEY, &[1u32, 2, 3]).unwrap();
        let back: Vec<u32> = load_collection(&store, EVENTS_KEY).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert!(store.dir().join("buddy_calendar_events.json").exists());
    }
}
