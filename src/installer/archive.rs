// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::CatalogEntry;
use crate::installer::client::HttpClient;
use crate::installer::extract::{content_root, extract_zip};
use crate::installer::traits::Installer;
use crate::inventory::InventoryEntry;
use crate::utils::{app_dir_name, validate_path_within_base, validate_url};

/// File written into every installed application directory.
pub const DETAILS_FILE: &str = "flatr-details.json";

#[derive(Debug, Serialize)]
struct InstallDetails<'a> {
    id: &'a str,
    name: &'a str,
    publisher: &'a str,
    version: &'a str,
    description: &'a str,
    icon: Option<&'a str>,
    source_url: &'a str,
    installed_at: DateTime<Utc>,
}

/// Installs applications distributed as ZIP archives, one directory per
/// application under `install_dir`.
pub struct ArchiveInstaller {
    client: HttpClient,
    install_dir: PathBuf,
    download_dir: PathBuf,
    allow_local_sources: bool,
}

impl ArchiveInstaller {
    pub fn new(client: HttpClient, install_dir: PathBuf, download_dir: PathBuf, allow_local_sources: bool) -> Self {
        Self {
            client,
            install_dir,
            download_dir,
            allow_local_sources,
        }
    }

    #[cfg(test)]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    async fn install_from_archive(&self, entry: &CatalogEntry, archive: &Path, staging: &Path, target: &Path) -> anyhow::Result<()> {
        self.client
            .download_with_retry(&entry.download.url, archive)
            .await
            .with_context(|| format!("Failed to download {}", entry.download.url))?;

        let files = extract_zip(archive.to_path_buf(), staging.to_path_buf()).await?;
        if files == 0 {
            anyhow::bail!("Archive for {} contains no files", entry.id);
        }

        let root = content_root(staging).await?;
        write_details(entry, &root).await?;
        swap_into_place(&root, target).await
    }
}

async fn write_details(entry: &CatalogEntry, dir: &Path) -> anyhow::Result<()> {
    let details = InstallDetails {
        id: entry.id.as_str(),
        name: entry.display_name(),
        publisher: &entry.metadata.publisher,
        version: &entry.version,
        description: &entry.metadata.description,
        icon: entry.metadata.icon.as_deref(),
        source_url: &entry.download.url,
        installed_at: Utc::now(),
    };
    tokio::fs::write(dir.join(DETAILS_FILE), serde_json::to_vec_pretty(&details)?)
        .await
        .context("Failed to write install details")
}

/// Move `source` to `target`. An existing `target` is moved aside first
/// and put back if the move fails.
async fn swap_into_place(source: &Path, target: &Path) -> anyhow::Result<()> {
    let backup = if tokio::fs::try_exists(target).await? {
        let name = target.file_name().and_then(|n| n.to_str()).unwrap_or("app");
        let backup = target.with_file_name(format!(".backup-{}-{}", name, Uuid::new_v4()));
        tokio::fs::rename(target, &backup)
            .await
            .with_context(|| format!("Failed to move aside {}", target.display()))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = tokio::fs::rename(source, target).await {
        if let Some(backup) = &backup {
            if let Err(restore) = tokio::fs::rename(backup, target).await {
                warn!(error = %restore, backup = %backup.display(), "Failed to restore previous install");
            }
        }
        return Err(e).with_context(|| format!("Failed to move new files into {}", target.display()));
    }

    if let Some(backup) = backup {
        if let Err(e) = tokio::fs::remove_dir_all(&backup).await {
            warn!(error = %e, backup = %backup.display(), "Failed to remove previous install");
        }
    }
    Ok(())
}

async fn remove_if_present(path: &Path) {
    let result = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(_) => return,
    };
    if let Err(e) = result {
        warn!(error = %e, path = %path.display(), "Failed to clean up");
    }
}

#[async_trait]
impl Installer for ArchiveInstaller {
    async fn install(&self, entry: &CatalogEntry) -> anyhow::Result<PathBuf> {
        validate_url(&entry.download.url, self.allow_local_sources).context("Refusing download URL")?;
        let dir_name = app_dir_name(entry.id.as_str())?;
        let target = self.install_dir.join(&dir_name);

        tokio::fs::create_dir_all(&self.install_dir).await?;
        tokio::fs::create_dir_all(&self.download_dir).await?;

        info!(app_id = %entry.id, version = %entry.version, target = %target.display(), "Installing application");

        let token = Uuid::new_v4();
        let archive = self.download_dir.join(format!("{}-{}.zip", token, dir_name));
        // Staging lives next to the target so the final move is a rename.
        let staging = self.install_dir.join(format!(".staging-{}", token));

        let result = self.install_from_archive(entry, &archive, &staging, &target).await;

        remove_if_present(&archive).await;
        remove_if_present(&staging).await;

        result?;
        info!(app_id = %entry.id, path = %target.display(), "Application installed");
        Ok(target)
    }

    async fn uninstall(&self, entry: &InventoryEntry) -> anyhow::Result<()> {
        if !tokio::fs::try_exists(&entry.install_path).await? {
            warn!(app_id = %entry.id, path = %entry.install_path.display(), "Install directory already gone");
            return Ok(());
        }

        validate_path_within_base(&entry.install_path, &self.install_dir)
            .context("Refusing to remove directory outside the install directory")?;

        tokio::fs::remove_dir_all(&entry.install_path)
            .await
            .with_context(|| format!("Failed to remove {}", entry.install_path.display()))?;

        info!(app_id = %entry.id, path = %entry.install_path.display(), "Application removed");
        Ok(())
    }
}
