//! Directory-backed blob store
//!
//! Layout: `<root>/<store name>/<sha256(key)>.json`. Each entry file holds
//! the key next to the snapshot, and a small `<sha256(key)>.key` sidecar
//! holds the key alone so `keys()` never has to load bodies. Writes go
//! through a temp file and a rename, so a single key is never torn.

use crate::error::{CacheError, CacheResult};
use crate::store::{BlobStore, Snapshot, StoreHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// On-disk entry format
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    #[serde(flatten)]
    snapshot: Snapshot,
}

/// Blob store with one directory per named store
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn store_dir(&self, name: &str) -> CacheResult<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(|c: char| c == '/' || c == '\\')
        {
            return Err(CacheError::store(name, "invalid store name"));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for DiskStore {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn StoreHandle>> {
        let dir = self.store_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(format!("creating store {}", dir.display()), e))?;

        Ok(Arc::new(DiskHandle {
            name: name.to_string(),
            dir,
        }))
    }

    async fn delete_store(&self, name: &str) -> CacheResult<bool> {
        let dir = self.store_dir(name)?;
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(format!("deleting store {}", dir.display()), e))?;
        debug!("Deleted store {}", name);
        Ok(true)
    }
}

/// Handle onto one store directory
#[derive(Debug)]
struct DiskHandle {
    name: String,
    dir: PathBuf,
}

impl DiskHandle {
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Key recorded for an entry file, from its sidecar when present
    async fn entry_key(&self, entry: &Path) -> CacheResult<String> {
        match fs::read_to_string(entry.with_extension("key")).await {
            Ok(key) => Ok(key),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No key sidecar for {}, reading entry", entry.display());
                Ok(self.read_entry(entry).await?.key)
            }
            Err(e) => Err(CacheError::io(format!("reading key for {}", entry.display()), e)),
        }
    }

    async fn read_entry(&self, path: &Path) -> CacheResult<DiskEntry> {
        let content = fs::read(path)
            .await
            .map_err(|e| CacheError::io(format!("reading entry {}", path.display()), e))?;
        serde_json::from_slice(&content).map_err(|e| {
            CacheError::store(&self.name, format!("corrupt entry {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl StoreHandle for DiskHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Snapshot>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let entry = self.read_entry(&path).await?;
        if entry.key != key {
            warn!("Entry {} holds key {}, expected {}", path.display(), entry.key, key);
            return Ok(None);
        }
        Ok(Some(entry.snapshot))
    }

    async fn put(&self, key: &str, value: Snapshot) -> CacheResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::io(format!("creating store {}", self.dir.display()), e))?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let entry = DiskEntry {
            key: key.to_string(),
            snapshot: value,
        };
        let content = serde_json::to_vec(&entry)?;

        fs::write(&tmp, content)
            .await
            .map_err(|e| CacheError::io(format!("writing entry {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| CacheError::io(format!("committing entry {}", path.display()), e))?;

        let sidecar = path.with_extension("key");
        fs::write(&sidecar, key)
            .await
            .map_err(|e| CacheError::io(format!("writing key {}", sidecar.display()), e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| CacheError::io(format!("removing entry {}", path.display()), e))?;

        let sidecar = path.with_extension("key");
        if let Err(e) = fs::remove_file(&sidecar).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove key {}: {}", sidecar.display(), e);
            }
        }
        Ok(true)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut keys = vec![];
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| CacheError::io(format!("reading store {}", self.dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("reading store entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                keys.push(self.entry_key(&path).await?);
            }
        }

        keys.sort();
        Ok(keys)
    }
}
