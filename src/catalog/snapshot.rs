// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::models::CatalogEntry;
use crate::models::ApplicationId;
use crate::utils::{from_keyed_json, to_keyed_json, write_atomically};

/// The catalog as of one successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    /// `None` until a fetch has ever succeeded
    pub fetched_at: Option<DateTime<Utc>>,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<CatalogEntry>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at: Some(fetched_at),
            entries,
        }
    }

    pub fn get(&self, id: &ApplicationId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    fetched_at: Option<DateTime<Utc>>,
    apps: serde_json::Map<String, serde_json::Value>,
}

/// Last-known-good catalog on disk.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached snapshot. A missing or unreadable cache yields an
    /// empty snapshot; the next successful fetch rewrites it.
    pub async fn load(&self) -> CatalogSnapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CatalogSnapshot::default(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to read catalog cache");
                return CatalogSnapshot::default();
            }
        };

        let parsed = serde_json::from_slice::<SnapshotFile>(&bytes)
            .map_err(anyhow::Error::from)
            .and_then(|file| {
                let entries = from_keyed_json(file.apps, |e: &CatalogEntry| e.id.as_str())?;
                Ok(CatalogSnapshot {
                    fetched_at: file.fetched_at,
                    entries,
                })
            });

        match parsed {
            Ok(snapshot) => {
                info!(count = snapshot.entries.len(), path = %self.path.display(), "Loaded cached catalog");
                snapshot
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Ignoring unreadable catalog cache");
                CatalogSnapshot::default()
            }
        }
    }

    pub async fn save(&self, snapshot: &CatalogSnapshot) -> anyhow::Result<()> {
        let file = SnapshotFile {
            fetched_at: snapshot.fetched_at,
            apps: to_keyed_json(&snapshot.entries, |e| e.id.as_str())?,
        };
        write_atomically(&self.path, serde_json::to_vec_pretty(&file)?).await
    }
}
