// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// No fetch has completed since startup
    #[default]
    Unknown,
    Online,
    Offline,
}

/// Process-wide synchronization status. Readers only ever see snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub reachability: Reachability,
    pub in_flight: bool,
    /// Reason of the most recent failed fetch, cleared on success
    pub last_error: Option<String>,
}

impl SyncStatus {
    pub fn is_offline(&self) -> bool {
        self.reachability == Reachability::Offline
    }
}

/// The single writer of [`SyncStatus`]. Owned by the scheduler; everyone
/// else holds a `watch::Receiver`.
#[derive(Debug)]
pub struct SyncStatusWriter {
    sender: watch::Sender<SyncStatus>,
}

impl SyncStatusWriter {
    /// `last_success` seeds the status from the cached catalog, if any.
    pub fn new(last_success: Option<DateTime<Utc>>) -> Self {
        let (sender, _) = watch::channel(SyncStatus {
            last_success,
            ..SyncStatus::default()
        });
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.sender.subscribe()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> SyncStatus {
        self.sender.borrow().clone()
    }

    pub fn set_in_flight(&self, in_flight: bool) {
        self.sender.send_if_modified(|status| {
            let changed = status.in_flight != in_flight;
            status.in_flight = in_flight;
            changed
        });
    }

    /// Record a successful fetch. Returns whether the engine was offline.
    pub fn mark_online(&self, at: DateTime<Utc>) -> bool {
        let mut was_offline = false;
        self.sender.send_modify(|status| {
            was_offline = status.is_offline();
            status.reachability = Reachability::Online;
            status.last_success = Some(at);
            status.last_error = None;
        });
        was_offline
    }

    /// Record a failed fetch. Returns whether this is a transition into
    /// offline mode.
    pub fn mark_offline(&self, reason: &str) -> bool {
        let mut transitioned = false;
        self.sender.send_modify(|status| {
            transitioned = !status.is_offline();
            status.reachability = Reachability::Offline;
            status.last_error = Some(reason.to_string());
        });
        transitioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let writer = SyncStatusWriter::new(None);
        let status = writer.snapshot();
        assert_eq!(status.reachability, Reachability::Unknown);
        assert!(!status.in_flight);
        assert!(status.last_success.is_none());
    }

    #[test]
    fn test_offline_transitions_once() {
        let writer = SyncStatusWriter::new(None);
        let reader = writer.subscribe();

        assert!(writer.mark_offline("timed out"));
        assert!(!writer.mark_offline("still timed out"));
        assert!(reader.borrow().is_offline());
        assert_eq!(reader.borrow().last_error.as_deref(), Some("still timed out"));

        let now = Utc::now();
        assert!(writer.mark_online(now));
        assert!(!writer.mark_online(now));
        assert_eq!(reader.borrow().reachability, Reachability::Online);
        assert_eq!(reader.borrow().last_success, Some(now));
        assert!(reader.borrow().last_error.is_none());
    }

    #[test]
    fn test_first_success_is_not_a_recovery() {
        let writer = SyncStatusWriter::new(None);
        assert!(!writer.mark_online(Utc::now()));
    }
}
