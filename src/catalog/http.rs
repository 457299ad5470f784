// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

use crate::catalog::models::CatalogEntry;
use crate::catalog::traits::{CatalogError, CatalogSource};

/// Fetches the catalog document from a single HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct CatalogDocument {
    apps: Vec<CatalogEntry>,
}

impl HttpCatalogClient {
    pub fn new(endpoint: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("FlatrStore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    async fn fetch_once(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CatalogError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, endpoint = %self.endpoint, "Catalog endpoint returned an error status");
            return Err(CatalogError::Unreachable(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Unreachable(e.to_string()))?;

        parse_catalog(&body)
    }
}

/// Parse and validate a catalog document.
///
/// Entries with an empty id make the whole document malformed. Repeated ids
/// keep their first occurrence.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<CatalogEntry>, CatalogError> {
    let document: CatalogDocument = serde_json::from_slice(body)
        .map_err(|e| CatalogError::MalformedResponse(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(document.apps.len());
    for entry in document.apps {
        if entry.id.as_str().trim().is_empty() {
            return Err(CatalogError::MalformedResponse("catalog entry with empty id".to_string()));
        }
        if !seen.insert(entry.id.clone()) {
            warn!(app_id = %entry.id, "Duplicate catalog entry, keeping the first one");
            continue;
        }
        entries.push(entry);
    }

    Ok(entries)
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        info!(endpoint = %self.endpoint, "Fetching catalog");

        let entries = tokio::time::timeout(self.timeout, self.fetch_once())
            .await
            .map_err(|_| CatalogError::Unreachable(format!("timed out after {}s", self.timeout.as_secs_f32())))??;

        info!(count = entries.len(), "Fetched catalog");
        Ok(entries)
    }
}
