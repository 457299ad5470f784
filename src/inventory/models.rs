// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::ApplicationId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Application this entry belongs to
    pub id: ApplicationId,

    /// Installed version, as reported by the catalog at install time
    pub version: String,

    /// Directory the application was installed into
    pub install_path: PathBuf,

    /// When the install (or latest update) completed
    pub installed_at: DateTime<Utc>,
}

impl InventoryEntry {
    pub fn new(id: ApplicationId, version: String, install_path: PathBuf) -> Self {
        Self {
            id,
            version,
            install_path,
            installed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_entry_new() {
        let entry = InventoryEntry::new(
            ApplicationId::new("flatr-notes"),
            "1.0".to_string(),
            PathBuf::from("/apps/flatr-notes"),
        );

        assert_eq!(entry.id.as_str(), "flatr-notes");
        assert_eq!(entry.version, "1.0");
        assert_eq!(entry.install_path, PathBuf::from("/apps/flatr-notes"));
        assert!(entry.installed_at <= Utc::now());
    }

    #[test]
    fn test_inventory_entry_deserialize_json() {
        let json = r#"{
            "id": "flatr-notes",
            "version": "1.2.0",
            "install_path": "/apps/flatr-notes",
            "installed_at": "2025-01-01T00:00:00Z"
        }"#;

        let entry: InventoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, ApplicationId::new("flatr-notes"));
        assert_eq!(entry.version, "1.2.0");
        assert_eq!(entry.installed_at.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
