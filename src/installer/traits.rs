// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::path::PathBuf;

use crate::catalog::CatalogEntry;
use crate::inventory::InventoryEntry;

/// Performs the filesystem side of install, update and uninstall.
///
/// Errors are opaque to the engine; their message becomes the FAILED reason.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install or replace the application described by `entry`, returning
    /// the directory it now lives in.
    async fn install(&self, entry: &CatalogEntry) -> anyhow::Result<PathBuf>;

    async fn uninstall(&self, entry: &InventoryEntry) -> anyhow::Result<()>;
}
