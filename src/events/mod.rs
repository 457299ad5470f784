// SPDX-License-Identifier: GPL-3.0-only
//! Events the engine publishes to the presentation layer.
//!
//! Serialized with a `type` tag:
//!
//! ```json
//! { "type": "state_changed", "app_id": "flatr-notes", "old_state": { "state": "up_to_date" }, ... }
//! ```

pub mod sink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;
use crate::models::ApplicationId;

pub use sink::{BroadcastSink, EventSink};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An application's lifecycle state changed. `old_state` is `None` the
    /// first time an application appears after startup.
    StateChanged {
        app_id: ApplicationId,
        old_state: Option<LifecycleState>,
        new_state: LifecycleState,
        timestamp: DateTime<Utc>,
    },

    /// An application is neither installed nor in the catalog any more.
    Withdrawn {
        app_id: ApplicationId,
        old_state: LifecycleState,
        timestamp: DateTime<Utc>,
    },

    /// The catalog became unreachable; the engine serves the cached catalog.
    Degraded {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The catalog is reachable again.
    Restored {
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn state_changed(app_id: ApplicationId, old_state: Option<LifecycleState>, new_state: LifecycleState) -> Self {
        Self::StateChanged {
            app_id,
            old_state,
            new_state,
            timestamp: Utc::now(),
        }
    }

    pub fn app_id(&self) -> Option<&ApplicationId> {
        match self {
            Self::StateChanged { app_id, .. } | Self::Withdrawn { app_id, .. } => Some(app_id),
            Self::Degraded { .. } | Self::Restored { .. } => None,
        }
    }
}
