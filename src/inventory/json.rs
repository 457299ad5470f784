// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use crate::inventory::{models::InventoryEntry, traits::{Inventory, InventoryError}};
use crate::models::ApplicationId;
use crate::utils::{from_keyed_json, to_keyed_json, write_atomically};

/// Inventory kept in memory and mirrored to a single JSON file.
///
/// The file holds one object keyed by application id. Mutations build the
/// new entry list, write it out in full and only then replace the
/// in-memory list, all under one lock.
pub struct JsonInventory {
    path: PathBuf,
    entries: Mutex<Vec<InventoryEntry>>,
}

impl JsonInventory {
    /// Load the inventory from `path`; a missing file is an empty inventory.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let entries = match tokio::fs::read(path).await {
            Ok(bytes) => {
                let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt inventory file: {}", path.display()))?;
                from_keyed_json(map, |e: &InventoryEntry| e.id.as_str())?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read inventory: {}", path.display()));
            }
        };

        info!(path = %path.display(), count = entries.len(), "Loaded inventory");

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &[InventoryEntry]) -> anyhow::Result<()> {
        let map = to_keyed_json(entries, |e| e.id.as_str())?;
        let contents = serde_json::to_vec_pretty(&map)?;
        write_atomically(&self.path, contents).await
    }
}

#[async_trait]
impl Inventory for JsonInventory {
    async fn list(&self) -> Vec<InventoryEntry> {
        self.entries.lock().await.clone()
    }

    async fn get(&self, id: &ApplicationId) -> Option<InventoryEntry> {
        self.entries.lock().await.iter().find(|e| &e.id == id).cloned()
    }

    async fn record_install(
        &self,
        id: &ApplicationId,
        version: &str,
        install_path: PathBuf,
    ) -> Result<InventoryEntry, InventoryError> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| &e.id == id) {
            return Err(InventoryError::AlreadyInstalled(id.clone()));
        }

        let entry = InventoryEntry::new(id.clone(), version.to_string(), install_path);
        let mut updated = entries.clone();
        updated.push(entry.clone());

        self.persist(&updated).await?;
        *entries = updated;

        info!(app_id = %id, version, "Recorded install");
        Ok(entry)
    }

    async fn record_update(&self, id: &ApplicationId, version: &str) -> Result<InventoryEntry, InventoryError> {
        let mut entries = self.entries.lock().await;
        let index = entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| InventoryError::NotInstalled(id.clone()))?;

        let mut updated = entries.clone();
        updated[index].version = version.to_string();
        updated[index].installed_at = chrono::Utc::now();
        let entry = updated[index].clone();

        self.persist(&updated).await?;
        *entries = updated;

        info!(app_id = %id, version, "Recorded update");
        Ok(entry)
    }

    async fn record_uninstall(&self, id: &ApplicationId) -> Result<InventoryEntry, InventoryError> {
        let mut entries = self.entries.lock().await;
        let index = entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| InventoryError::NotInstalled(id.clone()))?;

        let mut updated = entries.clone();
        let removed = updated.remove(index);

        self.persist(&updated).await?;
        *entries = updated;

        info!(app_id = %id, "Recorded uninstall");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ApplicationId {
        ApplicationId::new(s)
    }

    async fn setup_test_inventory() -> (JsonInventory, TempDir) {
        let dir = TempDir::new().unwrap();
        let inventory = JsonInventory::load(&dir.path().join("inventory.json")).await.unwrap();
        (inventory, dir)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (inventory, _dir) = setup_test_inventory().await;
        assert!(inventory.list().await.is_empty());
        assert!(!inventory.path().exists());
    }

    #[tokio::test]
    async fn test_record_install_and_get() {
        let (inventory, _dir) = setup_test_inventory().await;

        let entry = inventory.record_install(&id("app1"), "1.0", PathBuf::from("/apps/app1")).await.unwrap();
        assert_eq!(entry.version, "1.0");

        let fetched = inventory.get(&id("app1")).await.unwrap();
        assert_eq!(fetched, entry);
        assert!(inventory.get(&id("other")).await.is_none());
    }

    #[tokio::test]
    async fn test_record_install_twice_fails() {
        let (inventory, _dir) = setup_test_inventory().await;
        inventory.record_install(&id("app1"), "1.0", PathBuf::from("/a")).await.unwrap();

        let result = inventory.record_install(&id("app1"), "2.0", PathBuf::from("/b")).await;
        assert!(matches!(result, Err(InventoryError::AlreadyInstalled(ref i)) if i.as_str() == "app1"));
        assert_eq!(inventory.get(&id("app1")).await.unwrap().version, "1.0");
    }

    #[tokio::test]
    async fn test_record_update_requires_entry() {
        let (inventory, _dir) = setup_test_inventory().await;

        let result = inventory.record_update(&id("ghost"), "2.0").await;
        assert!(matches!(result, Err(InventoryError::NotInstalled(_))));

        inventory.record_install(&id("app1"), "1.0", PathBuf::from("/a")).await.unwrap();
        let updated = inventory.record_update(&id("app1"), "1.2").await.unwrap();
        assert_eq!(updated.version, "1.2");
        assert_eq!(updated.install_path, PathBuf::from("/a"));
    }

    #[tokio::test]
    async fn test_record_uninstall() {
        let (inventory, _dir) = setup_test_inventory().await;

        let result = inventory.record_uninstall(&id("ghost")).await;
        assert!(matches!(result, Err(InventoryError::NotInstalled(_))));

        inventory.record_install(&id("app1"), "1.0", PathBuf::from("/a")).await.unwrap();
        let removed = inventory.record_uninstall(&id("app1")).await.unwrap();
        assert_eq!(removed.id, id("app1"));
        assert!(inventory.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let (inventory, _dir) = setup_test_inventory().await;
        for name in ["zeta", "alpha", "mid"] {
            inventory.record_install(&id(name), "1", PathBuf::from(name)).await.unwrap();
        }
        inventory.record_update(&id("zeta"), "2").await.unwrap();

        let ids: Vec<String> = inventory.list().await.into_iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, ["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let (inventory, dir) = setup_test_inventory().await;
        inventory.record_install(&id("b"), "1.0", PathBuf::from("/b")).await.unwrap();
        inventory.record_install(&id("a"), "2.0", PathBuf::from("/a")).await.unwrap();
        inventory.record_update(&id("b"), "1.1").await.unwrap();
        drop(inventory);

        let reloaded = JsonInventory::load(&dir.path().join("inventory.json")).await.unwrap();
        let entries = reloaded.list().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, id("b"));
        assert_eq!(entries[0].version, "1.1");
        assert_eq!(entries[1].id, id("a"));
    }

    #[tokio::test]
    async fn test_file_is_keyed_by_id() {
        let (inventory, _dir) = setup_test_inventory().await;
        inventory.record_install(&id("app1"), "1.0", PathBuf::from("/a")).await.unwrap();

        let text = std::fs::read_to_string(inventory.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["app1"]["version"], "1.0");
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        // The inventory path is a directory, so the final rename fails.
        let path = dir.path().join("inventory.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();
        let inventory = JsonInventory {
            path: path.clone(),
            entries: Mutex::new(Vec::new()),
        };

        let result = inventory.record_install(&id("app1"), "1.0", PathBuf::from("/a")).await;
        assert!(matches!(result, Err(InventoryError::Persist(_))));
        assert!(inventory.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonInventory::load(&path).await.is_err());
    }
}
