// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::api::handlers::{ActionAccepted, ApiHandlers, ApiResult, RefreshAccepted, UpdateOutcome};
use crate::catalog::CatalogSnapshot;
use crate::api::websocket;
use crate::events::BroadcastSink;
use crate::lifecycle::{Action, LifecycleRecord};
use crate::sync::SyncStatus;

pub struct HttpServer {
    handlers: Arc<ApiHandlers>,
    events: BroadcastSink,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(handlers: Arc<ApiHandlers>, events: BroadcastSink, addr: SocketAddr) -> Self {
        Self { handlers, events, addr }
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let app = router(self.handlers, self.events);

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        Ok(())
    }
}

pub fn router(handlers: Arc<ApiHandlers>, events: BroadcastSink) -> Router {
    Router::new()
        .route("/api/health", get(ApiHandlers::health))
        .route("/api/status", get(status_handler))
        .route("/api/apps", get(list_apps_handler))
        .route("/api/apps/:id", get(get_app_handler))
        .route("/api/apps/:id/install", post(install_handler))
        .route("/api/apps/:id/update", post(update_handler))
        .route("/api/apps/:id/uninstall", post(uninstall_handler))
        .route("/api/update-all", post(update_all_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/refresh", post(refresh_handler))
        .with_state(handlers)
        .merge(websocket::router(events))
}

async fn status_handler(State(handlers): State<Arc<ApiHandlers>>) -> ApiResult<SyncStatus> {
    handlers.status().await
}

async fn list_apps_handler(State(handlers): State<Arc<ApiHandlers>>) -> ApiResult<Vec<LifecycleRecord>> {
    handlers.list_apps().await
}

async fn get_app_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<LifecycleRecord> {
    handlers.get_app(Path(id)).await
}

async fn install_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<ActionAccepted> {
    handlers.dispatch(Action::Install, Path(id)).await
}

async fn update_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<ActionAccepted> {
    handlers.dispatch(Action::Update, Path(id)).await
}

async fn uninstall_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<ActionAccepted> {
    handlers.dispatch(Action::Uninstall, Path(id)).await
}

async fn update_all_handler(State(handlers): State<Arc<ApiHandlers>>) -> ApiResult<Vec<UpdateOutcome>> {
    handlers.update_all().await
}

async fn catalog_handler(State(handlers): State<Arc<ApiHandlers>>) -> ApiResult<CatalogSnapshot> {
    handlers.catalog().await
}

async fn refresh_handler(State(handlers): State<Arc<ApiHandlers>>) -> ApiResult<RefreshAccepted> {
    handlers.refresh().await
}
