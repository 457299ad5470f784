// SPDX-License-Identifier: GPL-3.0-only
pub mod http;
pub mod models;
pub mod snapshot;
pub mod traits;

pub use http::HttpCatalogClient;
pub use models::CatalogEntry;
pub use snapshot::{CatalogSnapshot, SnapshotStore};
pub use traits::{CatalogError, CatalogSource};
