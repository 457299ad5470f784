// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::path::PathBuf;

use crate::inventory::models::InventoryEntry;
use crate::models::ApplicationId;

#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("Application already installed: {0}")]
    AlreadyInstalled(ApplicationId),

    #[error("Application not installed: {0}")]
    NotInstalled(ApplicationId),

    #[error("Failed to persist inventory: {0:#}")]
    Persist(#[from] anyhow::Error),
}

/// Record of what is installed on this machine.
///
/// Every mutating call persists the full inventory before it returns
/// success; a failed write leaves both views unchanged.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// All entries in insertion order
    async fn list(&self) -> Vec<InventoryEntry>;

    async fn get(&self, id: &ApplicationId) -> Option<InventoryEntry>;

    async fn record_install(
        &self,
        id: &ApplicationId,
        version: &str,
        install_path: PathBuf,
    ) -> Result<InventoryEntry, InventoryError>;

    async fn record_update(&self, id: &ApplicationId, version: &str) -> Result<InventoryEntry, InventoryError>;

    async fn record_uninstall(&self, id: &ApplicationId) -> Result<InventoryEntry, InventoryError>;
}
