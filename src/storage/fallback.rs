//! Fallback key-value persistence
//!
//! A flat map of string keys to string values, persisted as one JSON
//! object. Writes go to a sibling temp file first and are renamed into
//! place, so a reader sees either the old map or the new one.

use super::KeyValueStore;
use crate::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // An unreadable map is replaced rather than blocking every future write.
        let mut items = self.load().await.unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable {}: {}", self.path.display(), e);
            BTreeMap::new()
        });
        items.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&items)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-process key-value store, for hosts without a writable filesystem and for tests.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| poisoned())?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| poisoned())?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn poisoned() -> std::io::Error {
    std::io::Error::other("store lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("local-storage.json"));

        assert_eq!(store.get_item("user-location").await.unwrap(), None);

        store.set_item("theme", "dark").await.unwrap();
        store.set_item("user-location", r#"{"latitude":1.0,"longitude":2.0}"#).await.unwrap();

        assert_eq!(store.get_item("theme").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(
            store.get_item("user-location").await.unwrap().as_deref(),
            Some(r#"{"latitude":1.0,"longitude":2.0}"#)
        );
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileKeyValueStore::new(&path);

        assert!(store.get_item("user-location").await.is_err());

        store.set_item("user-location", "x").await.unwrap();
        assert_eq!(store.get_item("user-location").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryKeyValueStore::new();
        store.set_item("k", "v").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get_item("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_reports_poisoned_lock() {
        use crate::storage::LocationStore;
        use crate::testing::FailingConnector;
        use crate::{Coordinate, Error};
        use std::sync::Arc;

        let store = Arc::new(MemoryKeyValueStore::new());
        let holder = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = holder.items.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(store.set_item("k", "v").await.is_err());
        assert!(store.get_item("k").await.is_err());

        let location = LocationStore::new(Arc::new(FailingConnector), store);
        let err = location.put(Coordinate::new(1.0, 2.0)).await.unwrap_err();
        assert!(matches!(err, Error::PersistenceFailed { .. }));
    }
}
