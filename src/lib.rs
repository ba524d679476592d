//! stagecache - versioned offline asset cache
//!
//! Stages a new bundle version next to the one that is serving, swaps it in
//! atomically on activation and reuses every cached asset whose fingerprint
//! did not change. Requests for the entry document go online-first, every
//! other bundle asset is served cache-first and filled lazily.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod journal;
pub mod lifecycle;
pub mod net;
pub mod router;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{CacheError, CacheResult};
