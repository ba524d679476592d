//! Network fetch primitive
//!
//! A fetch either produces a `Snapshot` (whatever its status) or fails with
//! a transport error. Callers decide cacheability from `Snapshot::is_ok`.

pub mod dir;
pub mod http;

pub use dir::DirFetcher;
pub use http::HttpFetcher;

use crate::error::{CacheError, CacheResult};
use crate::store::Snapshot;
use async_trait::async_trait;
use futures_util::future::try_join_all;

/// How a fetch may use intermediate HTTP caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Normal request
    #[default]
    Default,
    /// Bypass any intermediate cache and revalidate with the origin
    Reload,
}

/// Abstract network interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch an origin-relative path (e.g. `main.dart.js` or `/`)
    async fn fetch(&self, path: &str, mode: FetchMode) -> CacheResult<Snapshot>;
}

/// Fetch every path concurrently, all-or-nothing
///
/// Fails on the first transport error or non-success status, so callers
/// never see a partial batch.
pub async fn fetch_all(
    fetcher: &dyn Fetcher,
    paths: &[String],
    mode: FetchMode,
) -> CacheResult<Vec<(String, Snapshot)>> {
    try_join_all(paths.iter().map(|path| async move {
        let snapshot = fetcher.fetch(path, mode).await?;
        if !snapshot.is_ok() {
            return Err(CacheError::BadStatus {
                path: path.clone(),
                status: snapshot.status,
            });
        }
        Ok((path.clone(), snapshot))
    }))
    .await
}
