//! Cache context: the three named stores every operation works against
//!
//! | Store | Default name | Holds |
//! |-------|--------------|-------|
//! | manifest | `app-manifest` | last activated resource table |
//! | temp | `app-temp` | shell files staged by install |
//! | content | `app-cache` | entries served to requests |

use crate::error::CacheResult;
use crate::store::{BlobStore, StoreHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Names of the stores used by one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreNames {
    /// Store holding the manifest record
    pub manifest: String,

    /// Store used as the install staging area
    pub temp: String,

    /// Store serving runtime requests
    pub content: String,
}

impl Default for StoreNames {
    fn default() -> Self {
        Self {
            manifest: "app-manifest".to_string(),
            temp: "app-temp".to_string(),
            content: "app-cache".to_string(),
        }
    }
}

/// Owns the blob store backend and handles onto the three stores
pub struct CacheContext {
    backend: Arc<dyn BlobStore>,
    names: StoreNames,
    manifest: Arc<dyn StoreHandle>,
    temp: Arc<dyn StoreHandle>,
    content: Arc<dyn StoreHandle>,
}

impl CacheContext {
    /// Open the three stores on `backend`
    pub async fn open(backend: Arc<dyn BlobStore>, names: StoreNames) -> CacheResult<Self> {
        let manifest = backend.open(&names.manifest).await?;
        let temp = backend.open(&names.temp).await?;
        let content = backend.open(&names.content).await?;

        Ok(Self {
            backend,
            names,
            manifest,
            temp,
            content,
        })
    }

    /// Store holding the manifest record
    pub fn manifest(&self) -> &dyn StoreHandle {
        self.manifest.as_ref()
    }

    /// Install staging store
    pub fn temp(&self) -> &dyn StoreHandle {
        self.temp.as_ref()
    }

    /// Store serving runtime requests
    pub fn content(&self) -> &dyn StoreHandle {
        self.content.as_ref()
    }

    /// Drop the whole staging store
    pub async fn clear_temp(&self) -> CacheResult<()> {
        self.backend.delete_store(&self.names.temp).await?;
        Ok(())
    }

    /// Drop the whole content store
    pub async fn clear_content(&self) -> CacheResult<()> {
        self.backend.delete_store(&self.names.content).await?;
        Ok(())
    }

    /// Delete content, temp and manifest stores
    ///
    /// Attempts all three even if one fails, returning the first error.
    pub async fn purge(&self) -> CacheResult<()> {
        let mut first_err = None;

        for name in [&self.names.content, &self.names.temp, &self.names.manifest] {
            match self.backend.delete_store(name).await {
                Ok(existed) => debug!("Purged store {} (existed: {})", name, existed),
                Err(e) => {
                    warn!("Failed to purge store {}: {}", name, e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
