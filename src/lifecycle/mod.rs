//! Version lifecycle: install → activate → serve
//!
//! Install stages the shell set into the temp store. Activate diffs the old
//! manifest record against the current resource table, evicts what changed,
//! merges the staged files into the content cache and commits the new
//! record. Any failure mid-activation purges every store; the next
//! activation then starts from an empty cache.
//!
//! # States
//!
//! | State | Entered by | Next |
//! |-------|------------|------|
//! | Installing | `new`, `install` | Installed, Redundant |
//! | Installed | successful install | Activating |
//! | Activating | `activate` | Active, Faulted |
//! | Active | successful activation | Activating, Installing |
//! | Faulted | failed activation | Installing, Activating |
//! | Redundant | failed install | Installing |

pub mod controller;
pub mod manifest;
pub mod state;

pub use controller::{ActivationReport, LifecycleController};
pub use manifest::{stale_keys, ManifestRecord, MANIFEST_KEY};
pub use state::LifecycleState;
