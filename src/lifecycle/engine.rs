// SPDX-License-Identifier: GPL-3.0-only
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogEntry, CatalogSnapshot};
use crate::events::{EngineEvent, EventSink};
use crate::installer::Installer;
use crate::inventory::{Inventory, InventoryEntry};
use crate::lifecycle::error::EngineError;
use crate::lifecycle::reconcile::{derive_state, reconcile};
use crate::lifecycle::state::{Action, LifecycleRecord, LifecycleState};
use crate::models::ApplicationId;
use crate::sync::SyncStatus;

/// Owns the published lifecycle records and runs user actions.
///
/// Records are re-derived from the inventory and the current catalog
/// snapshot on every change; the only state kept between passes is the
/// per-application overlay (transient or FAILED) set by actions.
pub struct LifecycleEngine {
    inventory: Arc<dyn Inventory>,
    installer: Arc<dyn Installer>,
    events: Arc<dyn EventSink>,
    status: watch::Receiver<SyncStatus>,
    state: Mutex<EngineState>,
}

struct EngineState {
    catalog: Arc<CatalogSnapshot>,
    overlays: HashMap<ApplicationId, LifecycleState>,
    records: Vec<LifecycleRecord>,
}

/// Work handed to an action task; carries everything the installer needs
/// so the task never reads engine state.
enum Job {
    Install(CatalogEntry),
    Update(CatalogEntry),
    Uninstall(InventoryEntry),
}

impl Job {
    fn action(&self) -> Action {
        match self {
            Job::Install(_) => Action::Install,
            Job::Update(_) => Action::Update,
            Job::Uninstall(_) => Action::Uninstall,
        }
    }

    fn app_id(&self) -> &ApplicationId {
        match self {
            Job::Install(entry) | Job::Update(entry) => &entry.id,
            Job::Uninstall(entry) => &entry.id,
        }
    }
}

/// Returned by a successful dispatch. Dropping it does not cancel the
/// action.
#[derive(Debug)]
pub struct ActionHandle {
    pub app_id: ApplicationId,
    pub action: Action,
    join: JoinHandle<Option<LifecycleState>>,
}

impl ActionHandle {
    /// Wait for the action to finish. Yields the application's state
    /// afterwards, `None` if it left the catalog and the inventory.
    pub async fn wait(self) -> Option<LifecycleState> {
        match self.join.await {
            Ok(state) => state,
            Err(e) => {
                error!(app_id = %self.app_id, error = %e, "Action task did not complete");
                None
            }
        }
    }
}

impl LifecycleEngine {
    /// Build the engine and its initial records. The initial pass is the
    /// baseline and emits no events.
    pub async fn new(
        inventory: Arc<dyn Inventory>,
        installer: Arc<dyn Installer>,
        events: Arc<dyn EventSink>,
        status: watch::Receiver<SyncStatus>,
        catalog: CatalogSnapshot,
    ) -> Arc<Self> {
        let stale = status.borrow().is_offline();
        let mut records = reconcile(&inventory.list().await, &catalog.entries);
        for record in &mut records {
            record.stale = stale;
        }

        info!(apps = records.len(), catalog = catalog.entries.len(), "Lifecycle engine ready");

        Arc::new(Self {
            inventory,
            installer,
            events,
            status,
            state: Mutex::new(EngineState {
                catalog: Arc::new(catalog),
                overlays: HashMap::new(),
                records,
            }),
        })
    }

    pub async fn records(&self) -> Vec<LifecycleRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn record(&self, id: &ApplicationId) -> Option<LifecycleRecord> {
        self.state.lock().await.records.iter().find(|r| &r.app_id == id).cloned()
    }

    pub async fn catalog(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.state.lock().await.catalog)
    }

    /// Swap in a freshly fetched catalog and reconcile against it. Returns
    /// the number of state-change events emitted.
    pub async fn replace_catalog(&self, snapshot: CatalogSnapshot) -> usize {
        let mut state = self.state.lock().await;
        state.catalog = Arc::new(snapshot);
        self.refresh_locked(&mut state).await
    }

    /// Re-derive every record against the current snapshot. Returns the
    /// number of state-change events emitted.
    pub async fn reconcile(&self) -> usize {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut EngineState) -> usize {
        let inventory = self.inventory.list().await;
        let stale = self.status.borrow().is_offline();
        let mut next = reconcile(&inventory, &state.catalog.entries);
        for record in &mut next {
            record.stale = stale;
        }

        // FAILED is dropped for applications that are gone; a running action
        // keeps its record until it commits.
        state.overlays.retain(|id, overlay| {
            overlay.is_transient() || next.iter().any(|r| &r.app_id == id)
        });
        for (id, overlay) in &state.overlays {
            match next.iter_mut().find(|r| &r.app_id == id) {
                Some(record) => record.state = overlay.clone(),
                None => next.push(LifecycleRecord {
                    app_id: id.clone(),
                    state: overlay.clone(),
                    installed: None,
                    available: None,
                    stale,
                }),
            }
        }

        let mut emitted = 0;
        for record in &next {
            let old = state
                .records
                .iter()
                .find(|r| r.app_id == record.app_id)
                .map(|r| r.state.clone());
            if old.as_ref() != Some(&record.state) {
                debug!(app_id = %record.app_id, old = ?old, new = %record.state, "State changed");
                self.events.emit(EngineEvent::state_changed(record.app_id.clone(), old, record.state.clone()));
                emitted += 1;
            }
        }
        for gone in state.records.iter().filter(|r| !next.iter().any(|n| n.app_id == r.app_id)) {
            debug!(app_id = %gone.app_id, "Application withdrawn");
            self.events.emit(EngineEvent::Withdrawn {
                app_id: gone.app_id.clone(),
                old_state: gone.state.clone(),
                timestamp: Utc::now(),
            });
            emitted += 1;
        }

        state.records = next;
        emitted
    }

    pub async fn install(self: &Arc<Self>, id: &ApplicationId) -> Result<ActionHandle, EngineError> {
        self.dispatch(Action::Install, id).await
    }

    pub async fn update(self: &Arc<Self>, id: &ApplicationId) -> Result<ActionHandle, EngineError> {
        self.dispatch(Action::Update, id).await
    }

    pub async fn uninstall(self: &Arc<Self>, id: &ApplicationId) -> Result<ActionHandle, EngineError> {
        self.dispatch(Action::Uninstall, id).await
    }

    /// Dispatch `update` for every installed application the catalog has a
    /// newer version of. Each application is tried on its own; a rejection
    /// is reported in its slot and does not stop the others.
    ///
    /// Candidates are chosen from the inventory and the catalog alone, so an
    /// application with a running or failed action is still tried.
    pub async fn update_all(self: &Arc<Self>) -> Vec<(ApplicationId, Result<ActionHandle, EngineError>)> {
        let catalog = self.catalog().await;
        let candidates: Vec<ApplicationId> = reconcile(&self.inventory.list().await, &catalog.entries)
            .into_iter()
            .filter(|record| record.state == LifecycleState::UpdateAvailable)
            .map(|record| record.app_id)
            .collect();

        info!(count = candidates.len(), "Updating all applications");

        let mut results = Vec::with_capacity(candidates.len());
        for id in candidates {
            let result = self.update(&id).await;
            results.push((id, result));
        }
        results
    }

    /// Validate `action` for `id`, move it to its transient state and start
    /// it in the background.
    ///
    /// Rejections are synchronous and leave every state untouched.
    pub async fn dispatch(self: &Arc<Self>, action: Action, id: &ApplicationId) -> Result<ActionHandle, EngineError> {
        let mut state = self.state.lock().await;

        // A running action hides the inventory change it is about to make,
        // so it is checked before the action's preconditions.
        if state.overlays.get(id).is_some_and(LifecycleState::is_transient) {
            return Err(EngineError::ActionInProgress(id.clone()));
        }

        let installed = self.inventory.get(id).await;
        let available = state.catalog.get(id).cloned();
        let derived = derive_state(installed.as_ref(), available.as_ref())
            .ok_or_else(|| EngineError::UnknownApplication(id.clone()))?;

        let job = match (action, installed, available) {
            (Action::Install, Some(_), _) => return Err(EngineError::AlreadyInstalled(id.clone())),
            (Action::Install, None, Some(entry)) => Job::Install(entry),
            (Action::Update | Action::Uninstall, None, _) => return Err(EngineError::NotInstalled(id.clone())),
            (Action::Update, Some(_), Some(entry)) if derived == LifecycleState::UpdateAvailable => Job::Update(entry),
            (Action::Update, Some(_), _) => return Err(EngineError::NoUpdateAvailable(id.clone())),
            (Action::Uninstall, Some(entry), _) => Job::Uninstall(entry),
            (Action::Install, None, None) => return Err(EngineError::UnknownApplication(id.clone())),
        };

        if action.needs_network() && self.status.borrow().is_offline() {
            return Err(EngineError::OfflineUnavailable {
                app_id: id.clone(),
                action,
            });
        }

        info!(app_id = %id, %action, "Dispatching action");
        state.overlays.insert(id.clone(), action.transient_state());
        self.refresh_locked(&mut state).await;
        drop(state);

        let engine = Arc::clone(self);
        let join = tokio::spawn(async move { engine.run(job).await });

        Ok(ActionHandle {
            app_id: id.clone(),
            action,
            join,
        })
    }

    async fn run(self: Arc<Self>, job: Job) -> Option<LifecycleState> {
        let installer = Arc::clone(&self.installer);
        let outcome = match &job {
            Job::Install(entry) | Job::Update(entry) => {
                let entry = entry.clone();
                isolate(async move { installer.install(&entry).await }).await.map(Some)
            }
            Job::Uninstall(entry) => {
                let entry = entry.clone();
                isolate(async move { installer.uninstall(&entry).await }).await.map(|_| None)
            }
        };

        self.commit(job, outcome).await
    }

    /// Record the outcome of an installer run: the inventory mutation on
    /// success, FAILED otherwise.
    async fn commit(&self, job: Job, outcome: anyhow::Result<Option<PathBuf>>) -> Option<LifecycleState> {
        let action = job.action();
        let id = job.app_id().clone();
        let mut state = self.state.lock().await;

        let recorded = match (outcome, &job) {
            (Ok(Some(path)), Job::Install(entry)) => self
                .inventory
                .record_install(&id, &entry.version, path)
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from),
            (Ok(_), Job::Update(entry)) => self
                .inventory
                .record_update(&id, &entry.version)
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from),
            (Ok(_), Job::Uninstall(_)) => self
                .inventory
                .record_uninstall(&id)
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from),
            (Ok(None), Job::Install(_)) => Err(anyhow::anyhow!("installer returned no install path")),
            (Err(e), _) => Err(e),
        };

        match recorded {
            Ok(()) => {
                info!(app_id = %id, %action, "Action completed");
                state.overlays.remove(&id);
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(app_id = %id, %action, reason = %reason, "Action failed");
                state.overlays.insert(id.clone(), LifecycleState::Failed { action, reason });
            }
        }

        self.refresh_locked(&mut state).await;
        state.records.iter().find(|r| r.app_id == id).map(|r| r.state.clone())
    }
}

/// Run installer work on its own task so a panic inside it becomes an
/// ordinary failure.
async fn isolate<T, F>(work: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(anyhow::anyhow!("installer panicked")),
        Err(e) => Err(anyhow::anyhow!("installer task cancelled: {}", e)),
    }
}
