//! Fetcher serving a local build directory
//!
//! Lets a bundle be installed straight from build output without running
//! a web server. Missing files answer 404 like an origin would.

use crate::bundle::ROOT_KEY;
use crate::error::{CacheError, CacheResult};
use crate::net::{FetchMode, Fetcher};
use crate::store::Snapshot;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serves origin-relative paths from a directory
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    /// Serve files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let relative = if path.is_empty() || path == ROOT_KEY {
            "index.html"
        } else {
            path.trim_start_matches('/')
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let content_type = match ext {
        "html" => "text/html",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",
        "css" => "text/css",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => return None,
    };
    Some(content_type)
}

#[async_trait]
impl Fetcher for DirFetcher {
    async fn fetch(&self, path: &str, _mode: FetchMode) -> CacheResult<Snapshot> {
        let Some(file) = self.resolve(path) else {
            return Ok(Snapshot::new(400, "bad path"));
        };
        if !file.is_file() {
            return Ok(Snapshot::new(404, "not found"));
        }

        let body = fs::read(&file)
            .await
            .map_err(|e| CacheError::network(path, e.to_string()))?;
        let mut snapshot = Snapshot::ok(body);
        snapshot.content_type = content_type_for(&file).map(str::to_string);
        Ok(snapshot)
    }
}
