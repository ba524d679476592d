//! Test doubles shared by unit tests

use crate::bundle::ResourceTable;
use crate::error::{CacheError, CacheResult};
use crate::net::{FetchMode, Fetcher};
use crate::store::{BlobStore, MemoryStore, Snapshot, StoreHandle};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Fetcher answering from a scripted map; unknown paths fail like a dropped connection
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Result<Snapshot, String>>>,
    calls: Mutex<Vec<(String, FetchMode)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `path`
    pub fn serve(&self, path: &str, body: &str) -> &Self {
        self.respond(path, Snapshot::ok(body.as_bytes().to_vec()))
    }

    pub fn respond(&self, path: &str, snapshot: Snapshot) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(snapshot));
        self
    }

    /// Make `path` fail with a transport error
    pub fn fail(&self, path: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Err("connection reset".to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, FetchMode)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.calls().into_iter().map(|(p, _)| p).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, path: &str, mode: FetchMode) -> CacheResult<Snapshot> {
        self.calls.lock().unwrap().push((path.to_string(), mode));
        match self.responses.lock().unwrap().get(path) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(reason)) => Err(CacheError::network(path, reason.clone())),
            None => Err(CacheError::network(path, "offline")),
        }
    }
}

/// Backend whose `put` fails for one store (optionally one key)
pub struct FailingStore {
    inner: MemoryStore,
    store: String,
    key: Option<String>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, store: &str, key: Option<&str>) -> Self {
        Self {
            inner,
            store: store.to_string(),
            key: key.map(str::to_string),
        }
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn StoreHandle>> {
        let inner = self.inner.open(name).await?;
        if name != self.store {
            return Ok(inner);
        }
        Ok(Arc::new(FailingHandle {
            inner,
            key: self.key.clone(),
        }))
    }

    async fn delete_store(&self, name: &str) -> CacheResult<bool> {
        self.inner.delete_store(name).await
    }
}

struct FailingHandle {
    inner: Arc<dyn StoreHandle>,
    key: Option<String>,
}

#[async_trait]
impl StoreHandle for FailingHandle {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Snapshot>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Snapshot) -> CacheResult<()> {
        if self.key.as_deref().map_or(true, |k| k == key) {
            return Err(CacheError::store(self.inner.name(), "disk full"));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        self.inner.keys().await
    }
}

/// Table from `(path, fingerprint)` pairs and a shell set
pub fn table(pairs: &[(&str, &str)], shell: &[&str]) -> ResourceTable {
    let resources: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ResourceTable::new(resources, shell.iter().map(|s| s.to_string()).collect()).unwrap()
}
