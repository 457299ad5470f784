// SPDX-License-Identifier: GPL-3.0-only
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::warn;

use crate::catalog::CatalogEntry;
use crate::inventory::InventoryEntry;
use crate::lifecycle::state::{LifecycleRecord, LifecycleState};
use crate::models::ApplicationId;
use crate::version::{compare, VersionTag};

/// Derive the resting state of one application from its inventory and
/// catalog entries. `None` when the application is in neither.
pub fn derive_state(
    installed: Option<&InventoryEntry>,
    available: Option<&CatalogEntry>,
) -> Option<LifecycleState> {
    match (installed, available) {
        (None, None) => None,
        (None, Some(_)) => Some(LifecycleState::NotInstalled),
        (Some(_), None) => Some(LifecycleState::Unknown),
        (Some(local), Some(remote)) => Some(compare_versions(local, remote)),
    }
}

fn compare_versions(local: &InventoryEntry, remote: &CatalogEntry) -> LifecycleState {
    if local.version.trim() == remote.version.trim() {
        return LifecycleState::UpToDate;
    }

    let parsed = VersionTag::parse(&local.version).and_then(|l| Ok((l, VersionTag::parse(&remote.version)?)));
    match parsed {
        Ok((installed, latest)) => match compare(&installed, &latest) {
            Ordering::Less => LifecycleState::UpdateAvailable,
            // A catalog behind the installed version has nothing to offer.
            Ordering::Equal | Ordering::Greater => LifecycleState::UpToDate,
        },
        Err(e) => {
            warn!(
                app_id = %local.id,
                installed = %local.version,
                latest = %remote.version,
                error = %e,
                "Versions not comparable, no update offered"
            );
            LifecycleState::Unknown
        }
    }
}

/// Derive records for every application in the union of inventory and
/// catalog: catalog order first, then installed applications the catalog no
/// longer lists.
///
/// Pure: the same inputs always give the same records.
pub fn reconcile(inventory: &[InventoryEntry], catalog: &[CatalogEntry]) -> Vec<LifecycleRecord> {
    let mut records = Vec::with_capacity(catalog.len() + inventory.len());
    let mut seen: HashSet<&ApplicationId> = HashSet::new();

    for remote in catalog {
        if !seen.insert(&remote.id) {
            continue;
        }
        let local = inventory.iter().find(|e| e.id == remote.id);
        if let Some(state) = derive_state(local, Some(remote)) {
            records.push(LifecycleRecord {
                app_id: remote.id.clone(),
                state,
                installed: local.cloned(),
                available: Some(remote.clone()),
                stale: false,
            });
        }
    }

    for local in inventory {
        if !seen.insert(&local.id) {
            continue;
        }
        if let Some(state) = derive_state(Some(local), None) {
            records.push(LifecycleRecord {
                app_id: local.id.clone(),
                state,
                installed: Some(local.clone()),
                available: None,
                stale: false,
            });
        }
    }

    records
}
