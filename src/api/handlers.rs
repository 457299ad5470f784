// SPDX-License-Identifier: GPL-3.0-only
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::catalog::CatalogSnapshot;
use crate::lifecycle::{Action, EngineError, LifecycleEngine, LifecycleRecord};
use crate::models::ApplicationId;
use crate::sync::{SchedulerHandle, SyncStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Error response with a status code and an `ApiResponse` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::UnknownApplication(_) => StatusCode::NOT_FOUND,
            EngineError::OfflineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::AlreadyInstalled(_)
            | EngineError::NotInstalled(_)
            | EngineError::NoUpdateAvailable(_)
            | EngineError::ActionInProgress(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAccepted {
    pub app_id: ApplicationId,
    pub action: Action,
}

/// One application's slot in an update-all response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub app_id: ApplicationId,
    pub accepted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshAccepted {
    /// `false` when a refresh was already pending
    pub queued: bool,
}

pub struct ApiHandlers {
    engine: Arc<LifecycleEngine>,
    scheduler: SchedulerHandle,
    status: watch::Receiver<SyncStatus>,
}

impl ApiHandlers {
    pub fn new(engine: Arc<LifecycleEngine>, scheduler: SchedulerHandle, status: watch::Receiver<SyncStatus>) -> Self {
        Self {
            engine,
            scheduler,
            status,
        }
    }
}

impl ApiHandlers {
    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    pub async fn status(&self) -> ApiResult<SyncStatus> {
        Ok(Json(ApiResponse::success(self.status.borrow().clone())))
    }

    pub async fn list_apps(&self) -> ApiResult<Vec<LifecycleRecord>> {
        Ok(Json(ApiResponse::success(self.engine.records().await)))
    }

    pub async fn get_app(&self, Path(id): Path<String>) -> ApiResult<LifecycleRecord> {
        let id = ApplicationId::new(id);
        match self.engine.record(&id).await {
            Some(record) => Ok(Json(ApiResponse::success(record))),
            None => Err(ApiError::not_found(format!("Unknown application: {}", id))),
        }
    }

    /// Start an action; completion is reported through events.
    pub async fn dispatch(&self, action: Action, Path(id): Path<String>) -> ApiResult<ActionAccepted> {
        let id = ApplicationId::new(id);
        info!(app_id = %id, %action, "Action requested");

        match self.engine.dispatch(action, &id).await {
            Ok(handle) => Ok(Json(ApiResponse::success(ActionAccepted {
                app_id: handle.app_id,
                action: handle.action,
            }))),
            Err(e) => {
                warn!(app_id = %id, %action, error = %e, "Action rejected");
                Err(e.into())
            }
        }
    }

    /// Start an update for every application with one available. Always
    /// succeeds; rejections are listed per application.
    pub async fn update_all(&self) -> ApiResult<Vec<UpdateOutcome>> {
        let outcomes = self
            .engine
            .update_all()
            .await
            .into_iter()
            .map(|(app_id, result)| match result {
                Ok(_) => UpdateOutcome {
                    app_id,
                    accepted: true,
                    error: None,
                },
                Err(e) => {
                    warn!(app_id = %app_id, error = %e, "Update rejected");
                    UpdateOutcome {
                        app_id,
                        accepted: false,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();
        Ok(Json(ApiResponse::success(outcomes)))
    }

    pub async fn catalog(&self) -> ApiResult<CatalogSnapshot> {
        Ok(Json(ApiResponse::success(self.engine.catalog().await.as_ref().clone())))
    }

    pub async fn refresh(&self) -> ApiResult<RefreshAccepted> {
        let queued = self.scheduler.refresh_now();
        info!(queued, "Refresh requested");
        Ok(Json(ApiResponse::success(RefreshAccepted { queued })))
    }
}
