//! Named blob stores holding response snapshots
//!
//! A `BlobStore` hands out isolated, named `StoreHandle`s. Each handle is a
//! flat key → `Snapshot` map with atomic single-key operations. There are no
//! multi-key transactions: callers that write several keys must be ready to
//! throw the whole store away if they fail halfway.
//!
//! | Backend | Persistence | Use |
//! |---------|-------------|-----|
//! | `MemoryStore` | process lifetime | tests, embedding |
//! | `DiskStore` | one directory per store | CLI |

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::CacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A stored network response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// HTTP status code
    pub status: u16,

    /// Content type reported by the origin, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Response body
    #[serde(with = "body_hex")]
    pub body: Vec<u8>,
}

impl Snapshot {
    /// Create a snapshot with the given status and body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Create a 200 snapshot
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Attach a content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Whether the status is in the 2xx range and the response may be cached
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

mod body_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// One named store instance
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Name the handle was opened with
    fn name(&self) -> &str;

    /// Look up a key
    async fn get(&self, key: &str) -> CacheResult<Option<Snapshot>>;

    /// Insert or overwrite a key
    async fn put(&self, key: &str, value: Snapshot) -> CacheResult<()>;

    /// Remove a key, returning whether it was present
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// List all keys currently stored
    async fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Factory for named stores
///
/// Handles stay usable after their store is deleted; the next write
/// recreates it empty.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open (creating if needed) the store with the given name
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn StoreHandle>>;

    /// Delete a store and all of its entries, returning whether it existed
    async fn delete_store(&self, name: &str) -> CacheResult<bool>;
}
