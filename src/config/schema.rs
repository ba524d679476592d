//! Configuration schema for stagecache
//!
//! Configuration is stored at `~/.config/stagecache/config.toml`

use crate::context::StoreNames;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application origin settings
    pub origin: OriginConfig,

    /// Store names
    pub stores: StoreNames,

    /// Bundle location
    pub bundle: BundleConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Record lifecycle events to the journal
    pub journal: bool,

    /// Override for the state directory holding stores and the journal
    pub state_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            journal: true,
            state_dir: None,
        }
    }
}

/// Application origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin the bundle is served from
    pub url: String,

    /// Largest response body accepted, in MB
    pub max_body_mb: u32,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            max_body_mb: 64,
        }
    }
}

impl OriginConfig {
    /// Body limit in bytes
    pub fn max_body_bytes(&self) -> u64 {
        u64::from(self.max_body_mb) * 1024 * 1024
    }
}

/// Bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Resource table JSON file
    pub resources: PathBuf,

    /// Local build directory; when set, assets are read from it instead of the origin
    pub build_dir: Option<PathBuf>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            resources: PathBuf::from("resources.json"),
            build_dir: None,
        }
    }
}
