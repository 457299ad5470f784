// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::catalog::models::{AppMetadata, DownloadDescriptor};
use crate::catalog::{CatalogEntry, CatalogError, CatalogSource};
use crate::config::Config;
use crate::events::{EngineEvent, EventSink};
use crate::installer::Installer;
use crate::inventory::InventoryEntry;
use crate::lifecycle::LifecycleState;
use crate::models::ApplicationId;

/// Catalog entry with a download URL derived from the id
pub fn catalog_entry(id: &str, version: &str) -> CatalogEntry {
    CatalogEntry {
        id: ApplicationId::new(id),
        version: version.to_string(),
        download: DownloadDescriptor {
            url: format!("https://downloads.example.com/{}.zip", id),
        },
        metadata: AppMetadata {
            name: format!("{} app", id),
            ..AppMetadata::default()
        },
    }
}

pub fn inventory_entry(id: &str, version: &str) -> InventoryEntry {
    InventoryEntry::new(
        ApplicationId::new(id),
        version.to_string(),
        PathBuf::from("/flatr-test/apps").join(id),
    )
}

/// Create a test configuration rooted in `dir`
pub fn create_test_config(dir: &Path) -> Config {
    Config {
        catalog_endpoint: "http://localhost:3000/catalog.json".to_string(),
        install_dir: dir.join("apps"),
        state_dir: dir.join("state"),
        local_api_bind: "127.0.0.1:0".parse().unwrap(), // Use port 0 to auto-assign
        log_level: "error".to_string(), // Reduce log noise in tests
        allow_local_sources: true,
        ..Config::default()
    }
}

/// Build an in-memory ZIP archive from `(path, contents)` pairs. Paths
/// ending in `/` become directories.
pub fn zip_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (path, contents) in files {
        if path.ends_with('/') {
            writer.add_directory(*path, options).unwrap();
        } else {
            writer.start_file(*path, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Installer double. Succeeds by default; can fail, panic or block until
/// the test releases it through [`FakeInstaller::gate`].
#[derive(Default)]
pub struct FakeInstaller {
    failure: Mutex<Option<String>>,
    panics: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    install_calls: AtomicUsize,
    installed: Mutex<Vec<ApplicationId>>,
    uninstalled: Mutex<Vec<ApplicationId>>,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits for a permit on [`FakeInstaller::gate`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn gate(&self) -> Arc<Semaphore> {
        Arc::clone(self.gate.as_ref().expect("installer is not gated"))
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn panic_on_install(&self) {
        self.panics.store(true, Ordering::SeqCst);
    }

    pub fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    /// Ids of successful installs and updates, in completion order
    pub fn installed(&self) -> Vec<ApplicationId> {
        self.installed.lock().unwrap().clone()
    }

    pub fn uninstalled(&self) -> Vec<ApplicationId> {
        self.uninstalled.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn check_failure(&self) -> anyhow::Result<()> {
        match self.failure.lock().unwrap().clone() {
            Some(reason) => Err(anyhow::anyhow!(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(&self, entry: &CatalogEntry) -> anyhow::Result<PathBuf> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.panics.load(Ordering::SeqCst) {
            panic!("installer exploded");
        }
        self.check_failure()?;
        self.installed.lock().unwrap().push(entry.id.clone());
        Ok(PathBuf::from("/flatr-test/apps").join(entry.id.as_str()))
    }

    async fn uninstall(&self, entry: &InventoryEntry) -> anyhow::Result<()> {
        self.wait_for_gate().await;
        self.check_failure()?;
        self.uninstalled.lock().unwrap().push(entry.id.clone());
        Ok(())
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// New states reported for `id`, in order
    pub fn transitions(&self, id: &str) -> Vec<LifecycleState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::StateChanged { app_id, new_state, .. } if app_id.as_str() == id => {
                    Some(new_state.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Catalog source that plays back canned results; the last one repeats.
pub struct ScriptedCatalog {
    responses: Mutex<VecDeque<Result<Vec<CatalogEntry>, CatalogError>>>,
    last: Mutex<Result<Vec<CatalogEntry>, CatalogError>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new(responses: Vec<Result<Vec<CatalogEntry>, CatalogError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(Ok(Vec::new())),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fetches block until the test adds permits to the returned semaphore.
    pub fn gated(responses: Vec<Result<Vec<CatalogEntry>, CatalogError>>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let catalog = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new(responses)
        };
        (catalog, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => {
                *self.last.lock().unwrap() = response.clone();
                response
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}
