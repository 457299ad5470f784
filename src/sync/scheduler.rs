// SPDX-License-Identifier: GPL-3.0-only
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogSnapshot, CatalogSource, SnapshotStore};
use crate::lifecycle::LifecycleEngine;
use crate::sync::offline::OfflineController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch succeeded and the new catalog is in place
    Synced { changed: usize },
    /// Fetch failed; records were recomputed from the cached catalog
    Offline { changed: usize },
}

/// One fetch-and-reconcile pass, guarded so that at most one runs at a time.
pub struct SyncCycle {
    engine: Arc<LifecycleEngine>,
    source: Arc<dyn CatalogSource>,
    store: SnapshotStore,
    offline: OfflineController,
    busy: AtomicBool,
}

/// Clears the busy flag and the in-flight status however the cycle ends.
struct InFlight<'a>(&'a SyncCycle);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
        self.0.offline.status().set_in_flight(false);
    }
}

impl SyncCycle {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        source: Arc<dyn CatalogSource>,
        store: SnapshotStore,
        offline: OfflineController,
    ) -> Self {
        Self {
            engine,
            source,
            store,
            offline,
            busy: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn offline(&self) -> &OfflineController {
        &self.offline
    }

    /// Run a cycle. `None` when another cycle is already in flight.
    pub async fn run(&self) -> Option<CycleOutcome> {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("Sync already in flight, trigger coalesced");
            return None;
        }
        let _in_flight = InFlight(self);
        self.offline.status().set_in_flight(true);

        let outcome = match self.source.fetch().await {
            Ok(entries) => {
                let fetched_at = Utc::now();
                let snapshot = CatalogSnapshot::new(entries, fetched_at);
                if let Err(e) = self.store.save(&snapshot).await {
                    warn!(error = %e, path = %self.store.path().display(), "Failed to cache catalog");
                }

                self.offline.fetch_succeeded(fetched_at);
                let changed = self.engine.replace_catalog(snapshot).await;
                info!(changed, "Catalog sync complete");
                CycleOutcome::Synced { changed }
            }
            Err(e) => {
                warn!(error = %e, "Catalog fetch failed");
                self.offline.fetch_failed(&e);
                let changed = self.engine.reconcile().await;
                CycleOutcome::Offline { changed }
            }
        };

        Some(outcome)
    }
}

/// Requests out-of-band syncs.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    trigger: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Ask for a sync now without resetting the timer. Returns `false` when
    /// a request is already pending or the scheduler has stopped.
    pub fn refresh_now(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }

    /// A handle with no scheduler behind it.
    #[cfg(test)]
    pub fn disconnected() -> Self {
        let (trigger, _) = mpsc::channel(1);
        Self { trigger }
    }
}

pub struct SyncScheduler;

impl SyncScheduler {
    /// Start the scheduler task. The first cycle runs immediately, then one
    /// per `period`; manual triggers are merged into the same loop.
    pub fn spawn(cycle: Arc<SyncCycle>, period: Duration) -> (SchedulerHandle, JoinHandle<()>) {
        let (trigger, mut requests) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "Sync scheduler started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut manual_open = true;

            loop {
                tokio::select! {
                    _ = interval.tick() => debug!("Sync timer fired"),
                    request = requests.recv(), if manual_open => match request {
                        Some(()) => debug!("Manual refresh requested"),
                        None => {
                            manual_open = false;
                            continue;
                        }
                    },
                }

                let cycle = Arc::clone(&cycle);
                tokio::spawn(async move {
                    cycle.run().await;
                });
            }
        });

        (SchedulerHandle { trigger }, task)
    }
}
