// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::catalog::models::CatalogEntry;

/// Why a catalog fetch failed. Both kinds send the engine offline; they are
/// kept apart for diagnostics.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the complete current catalog
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}
