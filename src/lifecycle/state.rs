// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::CatalogEntry;
use crate::inventory::InventoryEntry;
use crate::models::ApplicationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Install,
    Update,
    Uninstall,
}

impl Action {
    /// State an application sits in while this action runs
    pub fn transient_state(self) -> LifecycleState {
        match self {
            Action::Install => LifecycleState::Installing,
            Action::Update => LifecycleState::Updating,
            Action::Uninstall => LifecycleState::Uninstalling,
        }
    }

    /// Whether the action has to download from the catalog
    pub fn needs_network(self) -> bool {
        matches!(self, Action::Install | Action::Update)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Install => "install",
            Action::Update => "update",
            Action::Uninstall => "uninstall",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    NotInstalled,
    UpToDate,
    UpdateAvailable,
    /// Installed but missing from the catalog, or versions not comparable
    Unknown,
    Installing,
    Updating,
    Uninstalling,
    Failed { action: Action, reason: String },
}

impl LifecycleState {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LifecycleState::Installing | LifecycleState::Updating | LifecycleState::Uninstalling
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::NotInstalled => f.write_str("not installed"),
            LifecycleState::UpToDate => f.write_str("up to date"),
            LifecycleState::UpdateAvailable => f.write_str("update available"),
            LifecycleState::Unknown => f.write_str("unknown"),
            LifecycleState::Installing => f.write_str("installing"),
            LifecycleState::Updating => f.write_str("updating"),
            LifecycleState::Uninstalling => f.write_str("uninstalling"),
            LifecycleState::Failed { action, reason } => write!(f, "{} failed: {}", action, reason),
        }
    }
}

/// What the presentation layer sees for one application. Always derived,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub app_id: ApplicationId,
    pub state: LifecycleState,
    pub installed: Option<InventoryEntry>,
    pub available: Option<CatalogEntry>,
    /// Catalog data comes from the cache while offline
    pub stale: bool,
}
