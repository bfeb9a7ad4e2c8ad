// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe of [`EngineEvent`]s.
//!
//! A `broadcast::Sender` fanning out to every current receiver. Each
//! subscriber gets its own receiver queue, so adding or dropping a
//! subscriber mid-emission never perturbs an in-flight fan-out — that falls
//! out of `tokio::sync::broadcast`'s semantics directly, no hand-rolled
//! subscriber list needed.
//!
//! There is no persistence or replay: a late subscriber only observes events
//! emitted after it subscribes. Bridges that need backfill (e.g. the SSE
//! bridge) must read a snapshot from [`crate::agent_system::AgentSystem`] or
//! the session store first, then subscribe.

use tokio::sync::broadcast;

use crate::event::EngineEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// The engine-wide event bus.
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to every current subscriber. Synchronous and
    /// infallible from the caller's perspective: if there are no
    /// subscribers the event is simply dropped, matching `emit` semantics
    /// where publishing never blocks on or depends on subscriber presence.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to future events. The returned receiver observes only
    /// events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
