// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::catalog::CatalogError;
use crate::events::{EngineEvent, EventSink};
use crate::sync::status::{SyncStatus, SyncStatusWriter};

/// Switches the engine between online and degraded mode based on fetch
/// outcomes. Announces each switch exactly once.
pub struct OfflineController {
    status: SyncStatusWriter,
    events: Arc<dyn EventSink>,
}

impl OfflineController {
    pub fn new(status: SyncStatusWriter, events: Arc<dyn EventSink>) -> Self {
        Self { status, events }
    }

    pub fn status(&self) -> &SyncStatusWriter {
        &self.status
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Returns whether this failure took the engine offline.
    pub fn fetch_failed(&self, error: &CatalogError) -> bool {
        let reason = error.to_string();
        let entered = self.status.mark_offline(&reason);
        if entered {
            warn!(reason = %reason, "Catalog unreachable, serving cached catalog");
            self.events.emit(EngineEvent::Degraded {
                reason,
                timestamp: Utc::now(),
            });
        }
        entered
    }

    /// Returns whether this success brought the engine back online.
    pub fn fetch_succeeded(&self, at: DateTime<Utc>) -> bool {
        let restored = self.status.mark_online(at);
        if restored {
            info!("Catalog reachable again");
            self.events.emit(EngineEvent::Restored { timestamp: at });
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingSink;

    fn setup() -> (OfflineController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (OfflineController::new(SyncStatusWriter::new(None), sink.clone()), sink)
    }

    #[test]
    fn test_degraded_emitted_once_per_outage() {
        let (controller, sink) = setup();
        let error = CatalogError::Unreachable("connection refused".to_string());

        assert!(controller.fetch_failed(&error));
        assert!(!controller.fetch_failed(&error));
        assert!(!controller.fetch_failed(&CatalogError::MalformedResponse("eof".to_string())));

        assert_eq!(sink.count(|e| matches!(e, EngineEvent::Degraded { .. })), 1);
        assert!(controller.status().snapshot().is_offline());
    }

    #[test]
    fn test_restored_only_after_outage() {
        let (controller, sink) = setup();

        assert!(!controller.fetch_succeeded(Utc::now()));
        assert!(sink.events().is_empty());

        controller.fetch_failed(&CatalogError::Unreachable("timed out".to_string()));
        assert!(controller.fetch_succeeded(Utc::now()));
        assert!(!controller.fetch_succeeded(Utc::now()));

        assert_eq!(sink.count(|e| matches!(e, EngineEvent::Restored { .. })), 1);
        assert!(!controller.subscribe().borrow().is_offline());
    }
}
