//! HTTP fetcher backed by ureq
//!
//! ureq is blocking, so each request runs on the tokio blocking pool.

use crate::error::{CacheError, CacheResult};
use crate::net::{FetchMode, Fetcher};
use crate::store::Snapshot;
use async_trait::async_trait;
use tracing::debug;

/// Fetches paths relative to an application origin
#[derive(Clone)]
pub struct HttpFetcher {
    origin: String,
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher for `origin` (scheme and host, optional trailing slash)
    pub fn new(origin: &str, max_body_bytes: u64) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            origin: origin.trim_end_matches('/').to_string(),
            agent,
            max_body_bytes,
        }
    }

    /// Absolute URL for an origin-relative path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.origin, path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("origin", &self.origin)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str, mode: FetchMode) -> CacheResult<Snapshot> {
        let url = self.url_for(path);
        let agent = self.agent.clone();
        let limit = self.max_body_bytes;
        let owned_path = path.to_string();

        debug!("GET {} ({:?})", url, mode);
        tokio::task::spawn_blocking(move || {
            let mut request = agent.get(&url);
            if mode == FetchMode::Reload {
                request = request.header("Cache-Control", "no-cache");
            }

            let mut response = request
                .call()
                .map_err(|e| CacheError::network(&owned_path, e.to_string()))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_vec()
                .map_err(|e| CacheError::network(&owned_path, e.to_string()))?;

            Ok(Snapshot {
                status,
                content_type,
                body,
            })
        })
        .await
        .map_err(|e| CacheError::Internal(format!("fetch task failed: {}", e)))?
    }
}
