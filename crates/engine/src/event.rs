// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-wide typed events and the routing context carried with messages.

use serde::{Deserialize, Serialize};

use crate::descriptor::AgentDescriptor;
use crate::ids::AgentId;

/// Where an inbound item came from and how to reply to it.
///
/// `message_id` and any ephemeral command markers are transient: they are
/// stripped from [`crate::agent::AgentState::routing`] before it is
/// persisted, per the data-model invariant that routing context carries no
/// per-message scratch data across turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingContext {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Cron task identifier, set only for items on the `cron` source. Not a
    /// transient field: it stays on `routing` across persistence, since a
    /// cron agent's identity is pinned to it for the agent's lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl RoutingContext {
    /// Return a copy with the transient `message_id` cleared, as required
    /// before persisting routing context or inheriting it into a background
    /// agent's first message.
    pub fn without_transient(&self) -> Self {
        Self { message_id: None, ..self.clone() }
    }
}

/// Engine-wide events published on the [`crate::event_bus::EventBus`].
///
/// This is the closed set named in the component design: dashboards and IPC
/// bridges match on `kind()`/payload rather than a stringly-typed topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename = "init")]
    Init { status: String, cron: usize },
    #[serde(rename = "agent.created")]
    AgentCreated { agent_id: AgentId, descriptor: AgentDescriptor },
    #[serde(rename = "agent.restored")]
    AgentRestored { agent_id: AgentId, descriptor: AgentDescriptor },
    #[serde(rename = "agent.reset")]
    AgentReset { agent_id: AgentId },
    #[serde(rename = "session.updated")]
    SessionUpdated { agent_id: AgentId },
    #[serde(rename = "session.outgoing")]
    SessionOutgoing { agent_id: AgentId, text: Option<String> },
    #[serde(rename = "cron.task.added")]
    CronTaskAdded { task_id: String },
    #[serde(rename = "cron.task.ran")]
    CronTaskRan { task_id: String },
    #[serde(rename = "plugin.loaded")]
    PluginLoaded { name: String },
    #[serde(rename = "plugin.unloaded")]
    PluginUnloaded { name: String },
    #[serde(rename = "signal.generated")]
    SignalGenerated { agent_id: AgentId, kind: String },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::AgentCreated { .. } => "agent.created",
            Self::AgentRestored { .. } => "agent.restored",
            Self::AgentReset { .. } => "agent.reset",
            Self::SessionUpdated { .. } => "session.updated",
            Self::SessionOutgoing { .. } => "session.outgoing",
            Self::CronTaskAdded { .. } => "cron.task.added",
            Self::CronTaskRan { .. } => "cron.task.ran",
            Self::PluginLoaded { .. } => "plugin.loaded",
            Self::PluginUnloaded { .. } => "plugin.unloaded",
            Self::SignalGenerated { .. } => "signal.generated",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
