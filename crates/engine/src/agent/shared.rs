// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State an [`super::Agent`] handle and its [`super::AgentRunner`] both need
//! direct access to, split out so the handle can answer `state_snapshot()`
//! and `is_processing()` without going through the inbox.

use std::sync::atomic::AtomicBool;

use tokio::sync::RwLock;

use crate::agent_state::AgentState;
use crate::ids::{AgentId, StorageId};

pub struct Shared {
    pub agent_id: AgentId,
    pub storage_id: StorageId,
    pub state: RwLock<AgentState>,
    pub is_processing: AtomicBool,
    /// Set at construction when the store's last log entry for this agent
    /// was a dangling `incoming` with no matching `outgoing`; consumed by
    /// the first `restore` item the runner processes.
    pub needs_restore_reply: AtomicBool,
}
