//! Bundle description: the resource table and how to build one
//!
//! The resource table maps every logical asset path of a bundle version to
//! a content fingerprint. A change of fingerprint is the only signal the
//! cache uses to decide an asset changed between versions.

pub mod resources;
pub mod scan;

pub use resources::{ResourceTable, ROOT_KEY};
pub use scan::{scan_build_dir, ScanOptions, DEFAULT_SHELL};
