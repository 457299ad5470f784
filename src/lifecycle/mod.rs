// SPDX-License-Identifier: GPL-3.0-only
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod state;

pub use engine::LifecycleEngine;
pub use error::EngineError;
pub use state::{Action, LifecycleRecord, LifecycleState};
