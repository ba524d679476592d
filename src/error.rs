//! Error types for stagecache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stagecache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in stagecache
#[derive(Error, Debug)]
pub enum CacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Resource table errors
    #[error("Invalid resource table {path}: {reason}")]
    ResourceTableInvalid { path: PathBuf, reason: String },

    #[error("Shell path is not a known resource: {0}")]
    UnknownShellPath(String),

    // Store errors
    #[error("Store {store} failed: {reason}")]
    Store { store: String, reason: String },

    #[error("Corrupt manifest record: {0}")]
    CorruptManifest(String),

    // Network errors
    #[error("Fetch failed for {path}: {reason}")]
    Network { path: String, reason: String },

    #[error("Fetch for {path} returned status {status}")]
    BadStatus { path: String, status: u16 },

    // Lifecycle errors
    #[error("Install failed: {0}")]
    InstallFailed(#[source] Box<CacheError>),

    #[error("Activation failed, cache purged: {0}")]
    ActivationFailed(#[source] Box<CacheError>),

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error
    pub fn store(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Failed installs and activations are retried on the next lifecycle
    /// event, network failures on the next request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::BadStatus { .. } | Self::ActivationFailed(_) => true,
            Self::InstallFailed(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallFailed(_) => Some("The active version is untouched. Retry: stagecache install"),
            Self::ActivationFailed(_) => Some("All caches were cleared. Run: stagecache update"),
            Self::UnknownShellPath(_) => Some("Every --shell path must exist in the build directory"),
            Self::InvalidTransition { .. } => Some("Run: stagecache install"),
            Self::Network { .. } => Some("Check that the origin is reachable: stagecache config show"),
            _ => None,
        }
    }
}
