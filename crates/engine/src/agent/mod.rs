// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single agent: its inbox, its persisted state, and the consumer loop
//! that processes one [`crate::inbox::InboxItem`] at a time (§4.4).
//!
//! An `Arc`-shared handle cheap to clone and hand to the dispatcher, backed
//! by one spawned task that owns the actual mutable state and never runs
//! concurrently with itself.

mod deps;
mod runner;
mod shared;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

pub use deps::AgentDeps;

use crate::agent_state::AgentState;
use crate::ids::{AgentId, StorageId};
use crate::inbox::{Inbox, InboxItem};

use runner::AgentRunner;
use shared::Shared;

/// A live agent handle. Cloning shares the same underlying task and inbox;
/// there is exactly one [`AgentRunner`] per agent regardless of how many
/// handles exist.
#[derive(Clone)]
pub struct Agent {
    shared: Arc<Shared>,
    inbox: Inbox,
    runner: Arc<Mutex<Option<AgentRunner>>>,
    handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl Agent {
    /// Construct an agent from restored or freshly-created state. `deps` is
    /// shared read-only across every agent in the system.
    ///
    /// `needs_restore_reply` should be `true` when the store's last log
    /// entry for this agent was a dangling `incoming` — see
    /// [`crate::store::LoadedAgent::last_entry_kind`].
    pub fn new(
        agent_id: AgentId,
        storage_id: StorageId,
        state: AgentState,
        needs_restore_reply: bool,
        deps: AgentDeps,
    ) -> Self {
        let (inbox, consumer) = Inbox::channel();
        let shared = Arc::new(Shared {
            agent_id,
            storage_id,
            state: tokio::sync::RwLock::new(state),
            is_processing: AtomicBool::new(false),
            needs_restore_reply: AtomicBool::new(needs_restore_reply),
        });
        let runner = AgentRunner { shared: shared.clone(), consumer, deps };
        Self {
            shared,
            inbox,
            runner: Arc::new(Mutex::new(Some(runner))),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.shared.agent_id
    }

    pub fn storage_id(&self) -> &StorageId {
        &self.shared.storage_id
    }

    /// The posting handle for this agent's inbox. Cheap to clone further.
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn post(&self, item: InboxItem) {
        self.inbox.post(item);
    }

    /// Whether the runner is mid-turn. Read-only telemetry; never gates
    /// posting, since the inbox itself serializes processing.
    pub fn is_processing(&self) -> bool {
        self.shared.is_processing.load(Ordering::Acquire)
    }

    /// A consistent snapshot of the current persisted state.
    pub async fn state_snapshot(&self) -> AgentState {
        self.shared.state.read().await.clone()
    }

    /// Spawn the consumer loop. Idempotent: only the first call actually
    /// spawns a task, since the [`AgentRunner`] is taken out of the `Mutex`
    /// exactly once.
    pub async fn start(&self) {
        let mut guard = self.runner.lock().await;
        if let Some(runner) = guard.take() {
            let jh = tokio::spawn(runner.run());
            *self.handle.lock().await = Some(jh);
        }
    }

    /// Consume this handle, returning the runner's [`tokio::task::JoinHandle`]
    /// if `start` was called. Dropping `self` here drops this handle's own
    /// `Inbox` sender clone; once every other clone (normally none, since
    /// [`crate::agent_system::AgentSystem`] is the sole long-lived owner) is
    /// also gone, the consumer loop observes a closed channel and returns.
    pub async fn take_join_handle(self) -> Option<tokio::task::JoinHandle<()>> {
        self.handle.lock().await.take()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
