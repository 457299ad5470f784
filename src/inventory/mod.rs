// SPDX-License-Identifier: GPL-3.0-only
pub mod json;
pub mod models;
pub mod traits;

pub use json::JsonInventory;
pub use models::InventoryEntry;
pub use traits::Inventory;
