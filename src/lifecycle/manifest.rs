//! Manifest record and the diff that decides which cached entries survive
//!
//! The record is the resource table of the last successful activation,
//! stored as a single JSON blob. An entry cached under the old version may
//! be reused only if the new table lists the same fingerprint for it.

use crate::bundle::ResourceTable;
use crate::error::{CacheError, CacheResult};
use crate::store::{Snapshot, StoreHandle};
use std::collections::BTreeMap;

/// Key the record is stored under inside the manifest store
pub const MANIFEST_KEY: &str = "manifest";

/// Persisted path → fingerprint mapping of the active version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    resources: BTreeMap<String, String>,
}

impl ManifestRecord {
    /// Record for the given table
    pub fn from_table(table: &ResourceTable) -> Self {
        Self {
            resources: table.resources().clone(),
        }
    }

    /// Read the record, `None` if no activation has completed yet
    pub async fn load(store: &dyn StoreHandle) -> CacheResult<Option<Self>> {
        let Some(blob) = store.get(MANIFEST_KEY).await? else {
            return Ok(None);
        };

        let resources = serde_json::from_slice(&blob.body)
            .map_err(|e| CacheError::CorruptManifest(e.to_string()))?;
        Ok(Some(Self { resources }))
    }

    /// Overwrite the stored record
    pub async fn save(&self, store: &dyn StoreHandle) -> CacheResult<()> {
        let body = serde_json::to_vec(&self.resources)?;
        store
            .put(
                MANIFEST_KEY,
                Snapshot::ok(body).with_content_type("application/json"),
            )
            .await
    }

    /// Fingerprint recorded for a path
    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.resources.get(path).map(String::as_str)
    }

    /// Resource table of the version this record was committed for
    ///
    /// The shell set is not persisted, so the table has none.
    pub fn into_table(self) -> ResourceTable {
        ResourceTable::from_resources(self.resources)
    }

    /// Whether the record describes exactly this table
    pub fn matches(&self, table: &ResourceTable) -> bool {
        &self.resources == table.resources()
    }

    /// Number of recorded paths
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no path is recorded
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Cached keys that must be evicted before the new version may serve them
///
/// A key is stale when the current table no longer lists it, or when its
/// current fingerprint differs from the one the old record holds.
pub fn stale_keys<'a>(
    old: &ManifestRecord,
    current: &ResourceTable,
    cached: &'a [String],
) -> Vec<&'a str> {
    cached
        .iter()
        .map(String::as_str)
        .filter(|key| match current.fingerprint(key) {
            None => true,
            Some(fingerprint) => old.fingerprint(key) != Some(fingerprint),
        })
        .collect()
}
