// SPDX-License-Identifier: GPL-3.0-only
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::EngineEvent;

/// Receiver of engine events.
///
/// `emit` must not block; the engine never waits for acknowledgment.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest events rather than holding the
/// engine back.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<EngineEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: EngineEvent) {
        debug!(?event, "Publishing engine event");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
