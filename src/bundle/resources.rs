//! Resource table and shell set

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Sentinel key for the application's entry document
pub const ROOT_KEY: &str = "/";

/// Serialized form of a resource table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableFile {
    resources: BTreeMap<String, String>,
    #[serde(default)]
    shell: Vec<String>,
}

/// Immutable catalogue of the current bundle version
///
/// Every shell path is guaranteed to be a known resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTable {
    resources: BTreeMap<String, String>,
    shell: Vec<String>,
}

impl ResourceTable {
    /// Build a table, checking that the shell set is a subset of the resources
    pub fn new(resources: BTreeMap<String, String>, shell: Vec<String>) -> CacheResult<Self> {
        if let Some(missing) = shell.iter().find(|p| !resources.contains_key(*p)) {
            return Err(CacheError::UnknownShellPath(missing.clone()));
        }

        let mut seen = std::collections::HashSet::new();
        let shell = shell.into_iter().filter(|p| seen.insert(p.clone())).collect();
        Ok(Self { resources, shell })
    }

    /// Build a table with an empty shell set
    pub fn from_resources(resources: BTreeMap<String, String>) -> Self {
        Self {
            resources,
            shell: vec![],
        }
    }

    /// Load a table from a JSON file
    pub async fn from_file(path: &Path) -> CacheResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            CacheError::io(format!("reading resource table {}", path.display()), e)
        })?;

        let table = Self::parse(&content).map_err(|e| CacheError::ResourceTableInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(
            "Loaded {} resources ({} shell) from {}",
            table.len(),
            table.shell.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from its JSON form
    pub fn parse(content: &str) -> CacheResult<Self> {
        let file: TableFile = serde_json::from_str(content)?;
        Self::new(file.resources, file.shell)
    }

    /// Serialize to the JSON file form
    pub fn to_json(&self) -> CacheResult<String> {
        let file = TableFile {
            resources: self.resources.clone(),
            shell: self.shell.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the table to a JSON file
    pub async fn save(&self, path: &Path) -> CacheResult<()> {
        fs::write(path, self.to_json()?).await.map_err(|e| {
            CacheError::io(format!("writing resource table {}", path.display()), e)
        })
    }

    /// Fingerprint of a path, if it belongs to this bundle
    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.resources.get(path).map(String::as_str)
    }

    /// Whether a path belongs to this bundle
    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }

    /// Paths that must be staged before the version can activate
    pub fn shell(&self) -> &[String] {
        &self.shell
    }

    /// All resource paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// The path → fingerprint mapping, as persisted in the manifest record
    pub fn resources(&self) -> &BTreeMap<String, String> {
        &self.resources
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the table lists no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
