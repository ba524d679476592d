//! Fetch router: decides how each runtime request is answered
//!
//! Only `GET` requests for paths listed in the resource table are
//! intercepted. The entry document (`/`) is served online-first so it is as
//! fresh as possible; every other resource is served cache-first and filled
//! lazily on the first miss.

use crate::bundle::{ResourceTable, ROOT_KEY};
use crate::context::CacheContext;
use crate::error::CacheResult;
use crate::net::{FetchMode, Fetcher};
use crate::store::Snapshot;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Query marker appended to versioned asset URLs
const VERSION_MARKER: &str = "?v=";

/// A runtime request as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: String,
    /// Absolute URL, or a path relative to the application origin
    pub url: String,
}

impl Request {
    /// A `GET` request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }

    /// A request with an arbitrary method
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Routing decision for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Not intercepted; the host handles the request as usual
    Passthrough,
    /// Answered by the router
    Respond {
        key: String,
        source: Source,
        response: Snapshot,
    },
}

/// A request resolved against the application origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Content cache key
    pub key: String,
    /// Origin-relative path to fetch from the network
    pub path: String,
}

/// Resolve a request URL to its cache key and fetch path
///
/// Returns `None` for URLs on another origin. The origin root and hash-route
/// navigations (`origin/#...`) map to the root sentinel `/`, and a trailing
/// version marker (`?v=...`) is dropped from the key.
pub fn normalize(origin: &str, url: &str) -> Option<Target> {
    let origin = origin.trim_end_matches('/');

    let rest = if let Some(rest) = url.strip_prefix(origin) {
        if !(rest.is_empty() || rest.starts_with(['/', '?', '#'])) {
            return None;
        }
        rest
    } else if url.starts_with('/') || url.is_empty() {
        url
    } else {
        return None;
    };

    let path = match rest.split_once('#') {
        Some((before, _)) => before,
        None => rest,
    };
    let path = if path.is_empty() { ROOT_KEY } else { path };

    let mut key = rest.strip_prefix('/').unwrap_or(rest);
    if let Some((before, _)) = key.split_once(VERSION_MARKER) {
        key = before;
    }
    if let Some((before, _)) = key.split_once('#') {
        key = before;
    }

    let key = if key.is_empty() { ROOT_KEY } else { key };
    Some(Target {
        key: key.to_string(),
        path: path.to_string(),
    })
}

/// Routes runtime requests against the content cache
///
/// Each request works from the table that was serving when it arrived; a
/// version swap never changes the table under an in-flight request.
pub struct FetchRouter {
    origin: String,
    ctx: Arc<CacheContext>,
    table: RwLock<Arc<ResourceTable>>,
    fetcher: Arc<dyn Fetcher>,
}

impl FetchRouter {
    /// Router for an application served from `origin`
    pub fn new(
        origin: impl Into<String>,
        ctx: Arc<CacheContext>,
        table: Arc<ResourceTable>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            origin: origin.into(),
            ctx,
            table: RwLock::new(table),
            fetcher,
        }
    }

    /// Resource table of the serving version
    pub fn table(&self) -> Arc<ResourceTable> {
        let table = self.table.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&table)
    }

    /// Start serving a newly activated version
    pub fn serve(&self, table: Arc<ResourceTable>) {
        debug!("Serving table with {} resources", table.len());
        let mut current = self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = table;
    }

    /// Stores this router serves from
    pub fn context(&self) -> &Arc<CacheContext> {
        &self.ctx
    }

    /// Decide and, if intercepted, produce the response for a request
    ///
    /// Errors only when the network failed and no cached copy exists.
    pub async fn route(&self, request: &Request) -> CacheResult<Routed> {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Ok(Routed::Passthrough);
        }

        let Some(target) = normalize(&self.origin, &request.url) else {
            debug!("Not intercepting cross-origin {}", request.url);
            return Ok(Routed::Passthrough);
        };

        if !self.table().contains(&target.key) {
            debug!("Not intercepting unknown resource {}", target.key);
            return Ok(Routed::Passthrough);
        }

        if target.key == ROOT_KEY {
            self.online_first(target).await
        } else {
            self.cache_first(target).await
        }
    }

    async fn online_first(&self, target: Target) -> CacheResult<Routed> {
        match self.fetcher.fetch(&target.path, FetchMode::Default).await {
            Ok(response) => {
                if response.is_ok() {
                    self.fill(&target.key, &response).await;
                }
                Ok(Routed::Respond {
                    key: target.key,
                    source: Source::Network,
                    response,
                })
            }
            Err(fetch_err) => {
                debug!("Network failed for {}, trying cache: {}", target.key, fetch_err);
                match self.ctx.content().get(&target.key).await {
                    Ok(Some(response)) => Ok(Routed::Respond {
                        key: target.key,
                        source: Source::Cache,
                        response,
                    }),
                    Ok(None) => Err(fetch_err),
                    Err(store_err) => {
                        warn!("Cache lookup for {} failed: {}", target.key, store_err);
                        Err(fetch_err)
                    }
                }
            }
        }
    }

    async fn cache_first(&self, target: Target) -> CacheResult<Routed> {
        match self.ctx.content().get(&target.key).await {
            Ok(Some(response)) => {
                debug!("Cache hit {}", target.key);
                return Ok(Routed::Respond {
                    key: target.key,
                    source: Source::Cache,
                    response,
                });
            }
            Ok(None) => debug!("Cache miss {}", target.key),
            Err(e) => warn!("Cache lookup for {} failed, fetching: {}", target.key, e),
        }

        let response = self.fetcher.fetch(&target.path, FetchMode::Default).await?;
        if response.is_ok() {
            self.fill(&target.key, &response).await;
        }

        Ok(Routed::Respond {
            key: target.key,
            source: Source::Network,
            response,
        })
    }

    async fn fill(&self, key: &str, response: &Snapshot) {
        if let Err(e) = self.ctx.content().put(key, response.clone()).await {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}
