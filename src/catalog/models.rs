// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};

use crate::models::ApplicationId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    /// Archive (ZIP) containing the application
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub publisher: String,

    #[serde(default)]
    pub description: String,

    /// Icon location, if the catalog provides one
    #[serde(default)]
    pub icon: Option<String>,
}

/// One application as published by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ApplicationId,

    /// Latest published version
    pub version: String,

    pub download: DownloadDescriptor,

    #[serde(flatten)]
    pub metadata: AppMetadata,
}

impl CatalogEntry {
    /// Name to show for the entry; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.metadata.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.metadata.name
        }
    }
}
