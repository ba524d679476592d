//! In-process blob store

use crate::error::{CacheError, CacheResult};
use crate::store::{BlobStore, Snapshot, StoreHandle};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

type Buckets = HashMap<String, BTreeMap<String, Snapshot>>;

/// Blob store keeping every named store in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<Mutex<Buckets>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a store with this name currently exists
    pub fn contains_store(&self, name: &str) -> bool {
        self.buckets
            .lock()
            .map(|b| b.contains_key(name))
            .unwrap_or(false)
    }
}

fn lock<'a>(buckets: &'a Mutex<Buckets>, name: &str) -> CacheResult<MutexGuard<'a, Buckets>> {
    buckets
        .lock()
        .map_err(|_| CacheError::store(name, "memory store lock poisoned"))
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn StoreHandle>> {
        lock(&self.buckets, name)?
            .entry(name.to_string())
            .or_default();

        Ok(Arc::new(MemoryHandle {
            name: name.to_string(),
            buckets: Arc::clone(&self.buckets),
        }))
    }

    async fn delete_store(&self, name: &str) -> CacheResult<bool> {
        Ok(lock(&self.buckets, name)?.remove(name).is_some())
    }
}

/// Handle onto one named in-memory store
#[derive(Debug)]
struct MemoryHandle {
    name: String,
    buckets: Arc<Mutex<Buckets>>,
}

#[async_trait]
impl StoreHandle for MemoryHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Snapshot>> {
        let buckets = lock(&self.buckets, &self.name)?;
        Ok(buckets.get(&self.name).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, key: &str, value: Snapshot) -> CacheResult<()> {
        lock(&self.buckets, &self.name)?
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut buckets = lock(&self.buckets, &self.name)?;
        Ok(buckets
            .get_mut(&self.name)
            .map(|b| b.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let buckets = lock(&self.buckets, &self.name)?;
        Ok(buckets
            .get(&self.name)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default())
    }
}
