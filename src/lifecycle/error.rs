// SPDX-License-Identifier: GPL-3.0-only
use crate::lifecycle::state::Action;
use crate::models::ApplicationId;

/// Synchronous rejections of a dispatched action. None of them change any
/// state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unknown application: {0}")]
    UnknownApplication(ApplicationId),

    #[error("Application already installed: {0}")]
    AlreadyInstalled(ApplicationId),

    #[error("Application not installed: {0}")]
    NotInstalled(ApplicationId),

    #[error("No update available for {0}")]
    NoUpdateAvailable(ApplicationId),

    #[error("An action is already in progress for {0}")]
    ActionInProgress(ApplicationId),

    #[error("Cannot {action} {app_id} while offline")]
    OfflineUnavailable { app_id: ApplicationId, action: Action },
}
