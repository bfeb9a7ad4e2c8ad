// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted [`AgentState`]: everything about an agent that survives a
//! restart, minus its identity (`AgentId`/`StorageId`, which name the
//! storage location rather than living inside it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::{AgentDescriptor, Permissions};
use crate::event::RoutingContext;
use crate::ids::AgentId;
use crate::message::Message;

/// Extra context recorded only for agents spawned as background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AgentMeta {
    Background {
        parent_agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// The full normalized state of one agent, as snapshotted into `state.json`
/// and embedded in `state` log entries.
///
/// Invariant: `updated_at >= created_at`, enforced by only ever advancing
/// `updated_at` through [`Self::touch`]. `routing`, once set, has its
/// transient fields (`message_id`) stripped before any snapshot is taken —
/// callers must pass an already-stripped [`RoutingContext`] in, since this
/// type does not strip on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub permissions: Permissions,
    pub descriptor: AgentDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<AgentMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    /// A brand-new agent: no messages, default permissions, `created_at ==
    /// updated_at == now`.
    pub fn new(descriptor: AgentDescriptor, now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            provider_id: None,
            permissions: Permissions::default(),
            descriptor,
            routing: None,
            meta: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_meta(mut self, meta: AgentMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Advance `updated_at`. Must be called before any snapshot after a
    /// mutation, and never with a timestamp earlier than the current one.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn push_message(&mut self, message: Message, now: DateTime<Utc>) {
        self.messages.push(message);
        self.touch(now);
    }

    /// Reset per §4.4 step 2: keep the descriptor, drop everything else back
    /// to its initial value.
    pub fn truncate_for_reset(&mut self, now: DateTime<Utc>) {
        self.messages.clear();
        self.provider_id = None;
        self.permissions = Permissions::default();
        self.routing = None;
        self.touch(now);
    }

    /// Whether the first user message has already set routing context.
    pub fn has_routing(&self) -> bool {
        self.routing.is_some()
    }
}

#[cfg(test)]
#[path = "agent_state_tests.rs"]
mod tests;
