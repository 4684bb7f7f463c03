//! Concurrent key/value stores with JSON snapshot persistence.
//!
//! Every piece of local state (users, claims, mail flags, the CID registry,
//! the sent log) lives in a [`JsonStore`]. Stores are loaded at startup,
//! flushed periodically and written back on graceful shutdown. Stores
//! opened with [`JsonStore::write_through`] are also saved on every write,
//! since losing them cannot be repaired from the chain. Snapshots are a
//! JSON array of `[key, value]` pairs so keys need not be strings.

use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;

/// Errors raised while loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A thread-safe map that can be snapshotted to a JSON file.
pub struct JsonStore<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    inner: Arc<DashMap<K, V>>,
    path: Option<PathBuf>,
    write_through: bool,
    /// Serializes snapshot writes; they share one temp file.
    save_lock: Arc<Mutex<()>>,
}

impl<K, V> Clone for JsonStore<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
            path: self.path.clone(),
            write_through: self.write_through,
            save_lock: self.save_lock.clone(),
        }
    }
}

impl<K, V> JsonStore<K, V>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Create an empty store that never touches disk.
    pub fn in_memory(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(DashMap::new()),
            path: None,
            write_through: false,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open a store backed by `<data_dir>/<name>.json`, loading it if present.
    ///
    /// With no data directory the store is memory-only.
    pub fn open(name: &'static str, data_dir: Option<&str>) -> Result<Self, StoreError> {
        let Some(dir) = data_dir else {
            return Ok(Self::in_memory(name));
        };

        let path = Path::new(dir).join(format!("{name}.json"));
        let store = Self {
            name,
            inner: Arc::new(DashMap::new()),
            path: Some(path.clone()),
            write_through: false,
            save_lock: Arc::new(Mutex::new(())),
        };

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let entries: Vec<(K, V)> = serde_json::from_reader(reader)?;
            for (k, v) in entries {
                store.inner.insert(k, v);
            }
            tracing::info!(store = name, entries = store.inner.len(), "Loaded store snapshot");
        }
        metrics::record_store_size(name, store.inner.len());

        Ok(store)
    }

    /// Save the snapshot after every insert, removal or [`commit`](Self::commit).
    pub fn write_through(mut self) -> Self {
        self.write_through = true;
        self
    }

    /// Write the current contents to disk. No-op for memory-only stores.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries: Vec<(K, V)> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        // Write to a sibling file first so a crash never leaves half a snapshot.
        let tmp = path.with_extension("json.tmp");
        serde_json::to_writer(BufWriter::new(File::create(&tmp)?), &entries)?;
        fs::rename(&tmp, path)?;

        tracing::debug!(store = self.name, entries = entries.len(), "Saved store snapshot");
        Ok(())
    }

    /// Persist a change made through [`get_mut`](Self::get_mut) on a
    /// write-through store. The `RefMut` must already be dropped.
    pub fn commit(&self) {
        if !self.write_through {
            return;
        }
        if let Err(e) = self.save() {
            tracing::error!(store = self.name, error = %e, "Write-through save failed");
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.inner.insert(key, value);
        metrics::record_store_size(self.name, self.inner.len());
        self.commit();
        previous
    }

    /// Insert only if the key is absent. Returns false when it already existed.
    pub fn insert_new(&self, key: K, value: V) -> bool {
        use dashmap::mapref::entry::Entry;
        let inserted = match self.inner.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        };
        metrics::record_store_size(self.name, self.inner.len());
        if inserted {
            self.commit();
        }
        inserted
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.remove(key).map(|(_, v)| v);
        metrics::record_store_size(self.name, self.inner.len());
        if removed.is_some() {
            self.commit();
        }
        removed
    }

    /// Mutable access to an existing entry.
    pub fn get_mut(&self, key: &K) -> Option<RefMut<'_, K, V>> {
        self.inner.get_mut(key)
    }

    /// Mutable access to an entry, inserting `V::default()` first if absent.
    pub fn entry_or_default(&self, key: K) -> RefMut<'_, K, V>
    where
        V: Default,
    {
        self.inner.entry(key).or_default()
    }

    /// Clone out every value matching the predicate.
    pub fn filter_values(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> Vec<V> {
        self.inner
            .iter()
            .filter(|r| predicate(r.key(), r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_operations() {
        let store: JsonStore<String, u32> = JsonStore::in_memory("test");
        assert!(store.get(&"a".to_string()).is_none());

        assert!(store.insert("a".to_string(), 1).is_none());
        assert_eq!(store.insert("a".to_string(), 2), Some(1));
        assert!(!store.insert_new("a".to_string(), 3));
        assert_eq!(store.get(&"a".to_string()), Some(2));

        *store.entry_or_default("b".to_string()) += 5;
        assert_eq!(store.get(&"b".to_string()), Some(5));
        assert_eq!(store.len(), 2);

        let big = store.filter_values(|_, v| *v > 2);
        assert_eq!(big, vec![5]);

        assert_eq!(store.remove(&"a".to_string()), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persistence_with_tuple_keys() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let store: JsonStore<(String, u64), bool> = JsonStore::open("flags", Some(data_dir)).unwrap();
        store.insert(("alice@dexmail.app".to_string(), 7), true);
        store.save().unwrap();

        let loaded: JsonStore<(String, u64), bool> = JsonStore::open("flags", Some(data_dir)).unwrap();
        assert_eq!(loaded.get(&("alice@dexmail.app".to_string(), 7)), Some(true));
    }

    #[test]
    fn test_write_through_survives_without_save() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let store: JsonStore<String, u32> =
            JsonStore::open("durable", Some(data_dir)).unwrap().write_through();
        store.insert("a".to_string(), 1);
        store.insert("b".to_string(), 2);
        store.remove(&"b".to_string());
        if let Some(mut a) = store.get_mut(&"a".to_string()) {
            *a = 10;
        }
        store.commit();
        // No explicit save: the process could die here.

        let reopened: JsonStore<String, u32> = JsonStore::open("durable", Some(data_dir)).unwrap();
        assert_eq!(reopened.get(&"a".to_string()), Some(10));
        assert!(!reopened.contains(&"b".to_string()));
    }

    #[test]
    fn test_plain_store_waits_for_save() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let store: JsonStore<String, u32> = JsonStore::open("lazy", Some(data_dir)).unwrap();
        store.insert("a".to_string(), 1);

        let reopened: JsonStore<String, u32> = JsonStore::open("lazy", Some(data_dir)).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let result: Result<JsonStore<String, u32>, _> =
            JsonStore::open("broken", dir.path().to_str());
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
