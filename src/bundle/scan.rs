//! Build a resource table by fingerprinting a build directory
//!
//! Every regular file becomes a resource keyed by its `/`-separated path
//! relative to the build root. `index.html` is also registered under the
//! root sentinel so the entry document can be served for `/`.

use crate::bundle::resources::{ResourceTable, ROOT_KEY};
use crate::error::{CacheError, CacheResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Conventional entry files staged before the application can start
pub const DEFAULT_SHELL: &[&str] = &[
    "main.dart.js",
    "main.dart.wasm",
    "main.dart.mjs",
    "index.html",
    "flutter_bootstrap.js",
    "assets/AssetManifest.bin.json",
    "assets/FontManifest.json",
];

const ENTRY_DOCUMENT: &str = "index.html";

/// Options for scanning a build directory
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Explicit shell set; when empty, the existing `DEFAULT_SHELL` files are used
    pub shell: Vec<String>,

    /// Relative paths to leave out (e.g. the worker script itself)
    pub exclude: Vec<String>,
}

/// Hash file contents using SHA256, returning the first 32 hex chars
fn fingerprint_file(path: &Path) -> CacheResult<String> {
    let contents = fs::read(path)
        .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;

    let digest = Sha256::digest(&contents);
    Ok(hex::encode(&digest[..16]))
}

fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) -> CacheResult<()> {
    let entries =
        fs::read_dir(dir).map_err(|e| CacheError::io(format!("reading {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io("reading directory entry", e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;

        // Symlinked directories are not followed, a link cycle would never end
        if file_type.is_symlink() && path.is_dir() {
            debug!("Skipping symlinked directory {}", path.display());
            continue;
        }

        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if path.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| CacheError::Internal(e.to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.insert(key, fingerprint_file(&path)?);
        }
    }

    Ok(())
}

/// Fingerprint every file under `build_dir` into a resource table
pub fn scan_build_dir(build_dir: &Path, options: &ScanOptions) -> CacheResult<ResourceTable> {
    if !build_dir.is_dir() {
        return Err(CacheError::PathNotFound(build_dir.to_path_buf()));
    }

    let mut resources = BTreeMap::new();
    walk(build_dir, build_dir, &mut resources)?;

    for excluded in &options.exclude {
        resources.remove(excluded);
    }

    if let Some(fingerprint) = resources.get(ENTRY_DOCUMENT).cloned() {
        resources.insert(ROOT_KEY.to_string(), fingerprint);
    }

    let shell = if options.shell.is_empty() {
        DEFAULT_SHELL
            .iter()
            .filter(|p| resources.contains_key(**p))
            .map(|p| p.to_string())
            .collect()
    } else {
        options.shell.clone()
    };

    debug!(
        "Scanned {}: {} resources, {} shell",
        build_dir.display(),
        resources.len(),
        shell.len()
    );
    ResourceTable::new(resources, shell)
}
