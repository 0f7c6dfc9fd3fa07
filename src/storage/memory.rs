//! In-memory ordered key/value store.
//!
//! This provides a simple `BTreeMap`-backed implementation of
//! [`KeyValueStore`] for testing and development purposes.

use super::traits::{BatchOp, KeyValueStore, StoreError, WriteBatch};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

/// In-memory ordered key/value store.
///
/// Uses a `BTreeMap` for ordered prefix scans. Thread-safe via `RwLock`;
/// a batch applies under a single write lock, so readers observe it
/// atomically. `Clone` shares the underlying map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store wrapped in `Arc`.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_open()?;
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))?;
        entries.remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_open()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.check_open()?;
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl Clone for InMemoryStore {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = InMemoryStore::new();
        store.put(b"alpha", b"1").unwrap();

        assert_eq!(store.get(b"alpha").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"beta").unwrap(), None);
        assert!(store.has(b"alpha").unwrap());
        assert!(!store.has(b"beta").unwrap());
    }

    #[test]
    fn test_delete() {
        let store = InMemoryStore::new();
        store.put(b"alpha", b"1").unwrap();
        store.delete(b"alpha").unwrap();

        assert!(!store.has(b"alpha").unwrap());
        // Deleting an absent key is not an error.
        store.delete(b"alpha").unwrap();
    }

    #[test]
    fn test_scan_prefix_is_ordered() {
        let store = InMemoryStore::new();
        store.put(b"b/2", b"v2").unwrap();
        store.put(b"a/9", b"v9").unwrap();
        store.put(b"b/1", b"v1").unwrap();
        store.put(b"b/3", b"v3").unwrap();
        store.put(b"c/0", b"v0").unwrap();

        let hits = store.scan_prefix(b"b/").unwrap();
        let keys: Vec<&[u8]> = hits.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"b/1"[..], &b"b/2"[..], &b"b/3"[..]]);
    }

    #[test]
    fn test_write_batch_applies_in_order() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(b"alpha".to_vec(), b"1".to_vec());
        batch.put(b"beta".to_vec(), b"2".to_vec());
        batch.delete(b"alpha".to_vec());
        batch.put(b"beta".to_vec(), b"3".to_vec());

        store.write_batch(batch).unwrap();

        assert!(!store.has(b"alpha").unwrap());
        assert_eq!(store.get(b"beta").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clone_shares_entries() {
        let store = InMemoryStore::new();
        let shared = store.clone();
        store.put(b"alpha", b"1").unwrap();

        assert_eq!(shared.get(b"alpha").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_operations_fail_after_close() {
        let store = InMemoryStore::new();
        store.put(b"alpha", b"1").unwrap();
        store.close().unwrap();

        assert_eq!(store.get(b"alpha").unwrap_err(), StoreError::Closed);
        assert_eq!(store.put(b"beta", b"2").unwrap_err(), StoreError::Closed);
        assert_eq!(store.scan_prefix(b"").unwrap_err(), StoreError::Closed);
    }
}
