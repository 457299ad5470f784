// SPDX-License-Identifier: GPL-3.0-only
pub mod offline;
pub mod scheduler;
pub mod status;

pub use offline::OfflineController;
pub use scheduler::{SchedulerHandle, SyncCycle, SyncScheduler};
pub use status::{SyncStatus, SyncStatusWriter};
