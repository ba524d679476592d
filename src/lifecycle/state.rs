//! Lifecycle states of one bundle version

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a bundle version in the install → activate → serve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Shell set not staged yet
    Installing,
    /// Shell set fully staged, waiting to take over
    Installed,
    /// Diff and merge in progress
    Activating,
    /// Serving requests
    Active,
    /// Activation failed and the caches were purged
    Faulted,
    /// Install failed; this version never becomes current
    Redundant,
}

impl LifecycleState {
    /// Whether install may start from this state
    pub fn can_install(&self) -> bool {
        !matches!(self, Self::Activating)
    }

    /// Whether activation may start from this state
    pub fn can_activate(&self) -> bool {
        matches!(self, Self::Installed | Self::Active | Self::Faulted)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Faulted => "faulted",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}
