// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity resolution, lifecycle, and dispatch (§4.5).
//!
//! A `RwLock<HashMap<String, Arc<SessionEntry>>>`-style reverse-lookup table
//! keyed by a stable string id, routing inbound messages, permission
//! decisions, and background spawns to AgentId-keyed entries. The
//! mint-then-register path resolves an event to an existing session or
//! creates one under a single exclusive lock, never both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, RwLock};
use tracing::{error, warn};

use crate::agent::{Agent, AgentDeps};
use crate::agent_state::AgentState;
use crate::descriptor::{AgentDescriptor, PermissionDecision};
use crate::error::EngineError;
use crate::event::{EngineEvent, RoutingContext};
use crate::ids::AgentId;
use crate::inbox::InboxItem;
use crate::message::Message;

/// Lifecycle stage. `load()` reads persisted agents and restores them without
/// starting their consumers; `start()` starts every registered agent and
/// admits newly-created ones immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Loaded,
    Running,
}

/// Either an explicit agent id, or a descriptor to resolve/create against.
pub enum Target {
    Agent(AgentId),
    Descriptor(AgentDescriptor),
}

/// Strategy for [`AgentSystem::resolve_agent_id`].
pub enum ResolveStrategy {
    /// The `user` descriptor with the newest `updatedAt`.
    MostRecentForeground,
    /// The singleton `heartbeat` descriptor, if it has ever been created.
    Heartbeat,
}

/// Parameters for [`AgentSystem::start_background_agent`].
pub struct StartBackgroundAgent {
    pub prompt: String,
    pub parent_agent_id: AgentId,
    pub name: Option<String>,
    pub agent_id: Option<String>,
}

#[derive(Default)]
struct Inner {
    /// Reverse-lookup table covering both the `AgentKey`-bearing descriptors
    /// (`user`, `heartbeat`) and the stable-hint descriptors (`cron`,
    /// `subagent`) — two disjoint string namespaces sharing one map, since
    /// both serve the same purpose here: resolving a descriptor to the
    /// AgentId already registered for it.
    keys: HashMap<String, AgentId>,
    entries: HashMap<AgentId, Agent>,
}

pub struct AgentSystem {
    deps: AgentDeps,
    inner: RwLock<Inner>,
    stage: RwLock<Stage>,
}

impl AgentSystem {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps, inner: RwLock::new(Inner::default()), stage: RwLock::new(Stage::Idle) }
    }

    /// Restore every persisted agent. Agents whose last log entry is a
    /// dangling `incoming` get a `restore` item queued (it sits in the inbox
    /// until `start` spawns the consumer). Does not start any consumer.
    pub async fn load(&self) {
        let loaded = self.deps.store.load_agents();
        let mut inner = self.inner.write().await;
        for restored in loaded {
            let needs_restore_reply = restored.last_entry_kind.as_deref() == Some("incoming");
            if let Some(key) = lookup_key(&restored.descriptor) {
                inner.keys.insert(key, restored.agent_id.clone());
            }
            let agent = Agent::new(
                restored.agent_id.clone(),
                restored.storage_id,
                restored.state,
                needs_restore_reply,
                self.deps.clone(),
            );
            if needs_restore_reply {
                agent.post(InboxItem::Restore);
            }
            self.deps.event_bus.emit(EngineEvent::AgentRestored {
                agent_id: restored.agent_id.clone(),
                descriptor: restored.descriptor,
            });
            inner.entries.insert(restored.agent_id, agent);
        }
        drop(inner);
        *self.stage.write().await = Stage::Loaded;
    }

    /// Start every currently-registered agent's consumer loop and begin
    /// admitting newly-created agents immediately.
    pub async fn start(&self) {
        *self.stage.write().await = Stage::Running;
        let agents: Vec<Agent> = self.inner.read().await.entries.values().cloned().collect();
        for agent in agents {
            agent.start().await;
        }
    }

    /// Resolve (minting if necessary) the agent for `source`/`context` and
    /// post a `message` item. Returns the agent the message was routed to.
    pub async fn schedule_message(
        &self,
        source: &str,
        message: Message,
        context: RoutingContext,
    ) -> AgentId {
        self.warn_if_not_loaded().await;
        let descriptor = classify(source, &context);
        let agent_id = self.resolve_or_create(descriptor).await;
        self.post_to(&agent_id, InboxItem::Message { message, source: source.to_owned(), context }).await;
        agent_id
    }

    pub async fn schedule_permission_decision(
        &self,
        source: &str,
        decision: PermissionDecision,
        context: RoutingContext,
    ) -> AgentId {
        self.warn_if_not_loaded().await;
        let descriptor = classify(source, &context);
        let agent_id = self.resolve_or_create(descriptor).await;
        self.post_to(
            &agent_id,
            InboxItem::PermissionDecision { decision, source: source.to_owned(), context },
        )
        .await;
        agent_id
    }

    /// Post an item to `target`. For a descriptor target, resolves/creates
    /// as needed. For an agent-id target that doesn't resolve, fails unless
    /// the item is a `message` (dropped with a warning, since there is no
    /// descriptor to create an agent from).
    pub async fn post(&self, target: Target, item: InboxItem) -> Result<(), EngineError> {
        let agent_id = match target {
            Target::Agent(id) => {
                if self.inner.read().await.entries.contains_key(&id) {
                    id
                } else if matches!(item, InboxItem::Message { .. }) {
                    warn!(agent_id = %id, "message posted to unknown agent id, dropping");
                    return Ok(());
                } else {
                    return Err(EngineError::AgentNotFound(id.as_str().to_owned()));
                }
            }
            Target::Descriptor(descriptor) => self.resolve_or_create(descriptor).await,
        };
        self.post_to(&agent_id, item).await;
        Ok(())
    }

    /// As [`Self::post`], but returns a receiver resolved once the item
    /// finishes processing.
    pub async fn post_and_wait(
        &self,
        target: Target,
        item: InboxItem,
    ) -> Result<oneshot::Receiver<()>, EngineError> {
        let agent_id = match target {
            Target::Agent(id) => {
                if self.inner.read().await.entries.contains_key(&id) {
                    id
                } else {
                    return Err(EngineError::AgentNotFound(id.as_str().to_owned()));
                }
            }
            Target::Descriptor(descriptor) => self.resolve_or_create(descriptor).await,
        };
        let inner = self.inner.read().await;
        let entry = inner.entries.get(&agent_id).ok_or_else(|| {
            EngineError::Invariant(format!("agent {agent_id} vanished between resolve and post"))
        })?;
        Ok(entry.inbox().post_and_wait(item))
    }

    /// Post a `reset` item. No-op on an unknown id.
    pub async fn reset(&self, agent_id: &AgentId) {
        if let Some(entry) = self.inner.read().await.entries.get(agent_id) {
            entry.post(InboxItem::Reset { source: "system".to_owned() });
        }
    }

    /// Construct a `subagent` descriptor inheriting the parent's routing
    /// context (with `messageId` stripped) and post the prompt as its first
    /// message. Failures (missing parent) are logged, never rejected.
    pub async fn start_background_agent(&self, request: StartBackgroundAgent) -> AgentId {
        let parent = self.inner.read().await.entries.get(&request.parent_agent_id).cloned();
        let routing = match parent {
            Some(agent) => agent.state_snapshot().await.routing.unwrap_or_default(),
            None => {
                warn!(
                    parent_agent_id = %request.parent_agent_id,
                    "start_background_agent: parent not found, using default routing"
                );
                RoutingContext::default()
            }
        }
        .without_transient();

        let descriptor = AgentDescriptor::Subagent {
            id: request.agent_id.unwrap_or_else(|| AgentId::new().as_str().to_owned()),
            parent_agent_id: request.parent_agent_id.as_str().to_owned(),
            name: request.name.unwrap_or_else(|| "subagent".to_owned()),
        };
        let agent_id = self.resolve_or_create(descriptor).await;
        self.post_to(
            &agent_id,
            InboxItem::Message {
                message: Message::user_text(request.prompt),
                source: routing.source.clone(),
                context: routing,
            },
        )
        .await;
        agent_id
    }

    /// Address `agent_id` if given, else the most-recent foreground agent.
    /// Wraps `text` as a user message routed through the agent's own
    /// connector source.
    pub async fn send_agent_message(&self, agent_id: Option<AgentId>, text: String, origin: String) {
        let target = match agent_id {
            Some(id) => Some(id),
            None => self.resolve_agent_id(ResolveStrategy::MostRecentForeground).await,
        };
        let Some(target) = target else {
            warn!("send_agent_message: no agent to address");
            return;
        };
        let entry = self.inner.read().await.entries.get(&target).cloned();
        let Some(entry) = entry else { return };
        let routing = entry
            .state_snapshot()
            .await
            .routing
            .unwrap_or_else(|| RoutingContext { source: origin.clone(), ..Default::default() });
        entry.post(InboxItem::Message {
            message: Message::user_text(text),
            source: routing.source.clone(),
            context: routing,
        });
    }

    pub async fn resolve_agent_id(&self, strategy: ResolveStrategy) -> Option<AgentId> {
        match strategy {
            ResolveStrategy::Heartbeat => self.inner.read().await.keys.get("heartbeat").cloned(),
            ResolveStrategy::MostRecentForeground => {
                let entries: Vec<(AgentId, Agent)> =
                    self.inner.read().await.entries.iter().map(|(id, a)| (id.clone(), a.clone())).collect();
                let mut best: Option<(AgentId, DateTime<Utc>)> = None;
                for (id, agent) in entries {
                    let state = agent.state_snapshot().await;
                    if !matches!(state.descriptor, AgentDescriptor::User { .. }) {
                        continue;
                    }
                    let is_newer = match &best {
                        Some((_, t)) => state.updated_at > *t,
                        None => true,
                    };
                    if is_newer {
                        best = Some((id, state.updated_at));
                    }
                }
                best.map(|(id, _)| id)
            }
        }
    }

    /// Read-only snapshot for transport introspection endpoints.
    pub async fn list_agents(&self) -> Vec<(AgentId, AgentDescriptor, DateTime<Utc>, bool)> {
        let entries: Vec<(AgentId, Agent)> =
            self.inner.read().await.entries.iter().map(|(id, a)| (id.clone(), a.clone())).collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for (id, agent) in entries {
            let state = agent.state_snapshot().await;
            summaries.push((id, state.descriptor, state.updated_at, agent.is_processing()));
        }
        summaries
    }

    pub fn store(&self) -> &Arc<crate::store::SessionStore> {
        &self.deps.store
    }

    pub fn event_bus(&self) -> &Arc<crate::event_bus::EventBus> {
        &self.deps.event_bus
    }

    /// Stop admitting new items, drain every agent's in-flight turn up to
    /// `grace`, then abort whatever hasn't finished.
    ///
    /// Uses a `CancellationToken` plus a grace-window deadline, without a
    /// cooperative cancellation signal threaded through the turn loop: a
    /// turn already in flight runs to completion or is force-aborted at the
    /// deadline, rather than observing cancellation mid-turn.
    pub async fn shutdown(&self, grace: Duration) {
        *self.stage.write().await = Stage::Idle;
        let agents: Vec<Agent> = self.inner.write().await.entries.drain().map(|(_, a)| a).collect();
        let mut abort_handles = Vec::new();
        let mut handles = Vec::new();
        for agent in agents {
            if let Some(handle) = agent.take_join_handle().await {
                abort_handles.push(handle.abort_handle());
                handles.push(handle);
            }
        }
        if tokio::time::timeout(grace, futures_util::future::join_all(handles)).await.is_err() {
            warn!("shutdown grace period elapsed, aborting remaining agent tasks");
            for handle in abort_handles {
                handle.abort();
            }
        }
    }

    async fn warn_if_not_loaded(&self) {
        if *self.stage.read().await == Stage::Idle {
            warn!("message scheduled before AgentSystem::load(); buffering");
        }
    }

    async fn post_to(&self, agent_id: &AgentId, item: InboxItem) {
        if let Some(entry) = self.inner.read().await.entries.get(agent_id) {
            entry.post(item);
        } else {
            warn!(agent_id = %agent_id, "post_to: agent vanished before post");
        }
    }

    /// Resolve `descriptor` to an existing AgentId, or mint and register a
    /// new one. Atomic: the key lookup and registration happen under the
    /// same write-lock critical section, so two concurrent callers for the
    /// same key always observe the same winner.
    async fn resolve_or_create(&self, descriptor: AgentDescriptor) -> AgentId {
        let key = lookup_key(&descriptor);
        if let Some(key) = &key {
            if let Some(id) = self.inner.read().await.keys.get(key) {
                return id.clone();
            }
        }

        let mut inner = self.inner.write().await;
        if let Some(key) = &key {
            if let Some(id) = inner.keys.get(key) {
                return id.clone();
            }
        }

        let agent_id = AgentId::new();
        let storage_id = crate::ids::StorageId::new();
        let now = Utc::now();
        if let Err(e) = self.deps.store.record_session_created(&agent_id, &storage_id, &descriptor, now)
        {
            error!(agent_id = %agent_id, error = %e, "failed to record session_created");
        }
        let state = AgentState::new(descriptor.clone(), now);
        // `load_one` requires state.json to exist alongside descriptor.json, so a
        // freshly-created agent needs an initial snapshot before its first turn
        // completes. No log entry here: `state` log entries mark turn-driven
        // updates only.
        if let Err(e) = self.deps.store.write_state(&agent_id, &state) {
            error!(agent_id = %agent_id, error = %e, "failed to write initial state");
        }
        let agent = Agent::new(agent_id.clone(), storage_id, state, false, self.deps.clone());
        if let Some(key) = key {
            inner.keys.insert(key, agent_id.clone());
        }
        inner.entries.insert(agent_id.clone(), agent.clone());
        let should_start = *self.stage.read().await == Stage::Running;
        drop(inner);

        self.deps.event_bus.emit(EngineEvent::AgentCreated {
            agent_id: agent_id.clone(),
            descriptor,
        });
        if should_start {
            agent.start().await;
        }
        agent_id
    }
}

/// The reverse-lookup key for a descriptor, covering both `AgentKey`-bearing
/// kinds (`user`, `heartbeat`) and stable-hint kinds (`cron`, `subagent`).
fn lookup_key(descriptor: &AgentDescriptor) -> Option<String> {
    descriptor.key().map(|k| k.as_str().to_owned()).or_else(|| descriptor.stable_hint())
}

/// Identity rules (§4.5, deterministic):
/// - non-system source with both `userId`/`channelId` -> `user{...}`.
/// - `cron` source with a task id -> `cron{id}`; without one, a one-off
///   `subagent` descriptor (fresh id, never reused): there is no dedicated
///   descriptor kind for an identity-less cron/system source.
/// - `heartbeat` source -> the singleton `heartbeat` descriptor.
/// - anything else lacking identifying fields -> a one-off `subagent`
///   descriptor, same reasoning as the cron fallback.
fn classify(source: &str, context: &RoutingContext) -> AgentDescriptor {
    if source == "heartbeat" {
        return AgentDescriptor::Heartbeat;
    }
    if source == "cron" {
        if let Some(task_id) = &context.task_id {
            return AgentDescriptor::Cron { id: task_id.clone() };
        }
        return AgentDescriptor::Subagent {
            id: AgentId::new().as_str().to_owned(),
            parent_agent_id: String::new(),
            name: "cron".to_owned(),
        };
    }
    if let (Some(user_id), Some(channel_id)) = (&context.user_id, &context.channel_id) {
        return AgentDescriptor::User {
            connector: source.to_owned(),
            user_id: user_id.clone(),
            channel_id: channel_id.clone(),
        };
    }
    AgentDescriptor::Subagent {
        id: AgentId::new().as_str().to_owned(),
        parent_agent_id: String::new(),
        name: source.to_owned(),
    }
}

#[cfg(test)]
#[path = "agent_system_tests.rs"]
mod tests;
