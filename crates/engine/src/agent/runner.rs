// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-consumer loop and per-item turn algorithm (§4.4).
//!
//! One owned consumer draining a channel, one item fully handled before the
//! next is taken. The state-machine shape (`idle -> draining -> turn{...}
//! -> idle`) is implicit in which branch of `process_item` is executing
//! rather than an explicit named enum, since `is_processing` is the only
//! externally observable phase callers need.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use crate::connector::OutgoingReply;
use crate::descriptor::PermissionDecision;
use crate::error::EngineError;
use crate::event::{EngineEvent, RoutingContext};
use crate::inbox::{InboxConsumer, InboxItem};
use crate::inference::InferenceContext;
use crate::message::{FileRef, Message, Role};
use crate::store::Origin;
use crate::tools::{ToolCall, ToolContext};

use super::deps::AgentDeps;
use super::shared::Shared;

/// Hard cap on inference calls per inbound `message` item (§8).
const MAX_TOOL_LOOP_ITERATIONS: usize = 5;

pub struct AgentRunner {
    pub(super) shared: Arc<Shared>,
    pub(super) consumer: InboxConsumer,
    pub(super) deps: AgentDeps,
}

impl AgentRunner {
    pub async fn run(mut self) {
        while let Some(envelope) = self.consumer.next().await {
            let (item, completion) = envelope.split();
            self.shared.is_processing.store(true, Ordering::Release);
            self.process_item(item).await;
            self.shared.is_processing.store(false, Ordering::Release);
            completion.complete();
        }
    }

    async fn process_item(&self, item: InboxItem) {
        match item {
            InboxItem::Restore => self.process_restore().await,
            InboxItem::Reset { source } => self.process_reset(&source).await,
            InboxItem::PermissionDecision { decision, .. } => {
                self.process_permission_decision(decision).await
            }
            InboxItem::Message { message, source, context } => {
                self.process_message(message, source, context).await
            }
        }
    }

    /// Step 1: a dangling `incoming` with no matching `outgoing` gets a
    /// synthesized "Internal error." reply; anything else is dropped.
    async fn process_restore(&self) {
        if !self.shared.needs_restore_reply.swap(false, Ordering::AcqRel) {
            return;
        }
        let now = Utc::now();
        let routing = {
            let state = self.shared.state.read().await;
            state.routing.clone()
        };
        let Some(routing) = routing else {
            warn!(agent_id = %self.shared.agent_id, "restore needed but no routing context on record");
            return;
        };
        let text = "Internal error.".to_owned();
        {
            let mut state = self.shared.state.write().await;
            state.push_message(Message::system_note(&text), now);
        }
        self.send_and_record_outgoing(&routing, Some(text), Vec::new(), Origin::System, now)
            .await;
        self.record_state(now).await;
    }

    /// Step 2: truncate state, note the reset, snapshot, emit `agent.reset`.
    async fn process_reset(&self, _source: &str) {
        let now = Utc::now();
        {
            let mut state = self.shared.state.write().await;
            state.truncate_for_reset(now);
        }
        if let Err(e) = self.deps.store.record_note(
            &self.shared.agent_id,
            &self.shared.storage_id,
            "reset",
            None,
            now,
        ) {
            error!(agent_id = %self.shared.agent_id, error = %e, "failed to record reset note");
        }
        self.record_state(now).await;
        self.deps
            .event_bus
            .emit(EngineEvent::AgentReset { agent_id: self.shared.agent_id.clone() });
    }

    /// Step 3: apply in order `web -> read -> write`; reject non-absolute
    /// paths; persist state; no outgoing.
    async fn process_permission_decision(&self, decision: PermissionDecision) {
        let now = Utc::now();
        {
            let mut state = self.shared.state.write().await;
            let errors = state.permissions.apply_all(vec![decision]);
            for e in errors {
                warn!(agent_id = %self.shared.agent_id, error = %e, "rejected permission decision");
            }
        }
        self.record_state(now).await;
    }

    /// Steps 4-5: the inference/tool loop and reply.
    async fn process_message(&self, message: Message, source: String, context: RoutingContext) {
        let now = Utc::now();
        let message_id = context.message_id.clone();

        {
            let mut state = self.shared.state.write().await;
            if !state.has_routing() {
                state.routing = Some(context.without_transient());
            }
            state.push_message(message.clone(), now);
        }

        if let Err(e) = self.deps.store.record_incoming(
            &self.shared.agent_id,
            &self.shared.storage_id,
            &source,
            message_id.clone(),
            Some(message.text()),
            message.files.clone(),
            serde_json::to_value(&context).unwrap_or(serde_json::Value::Null),
            now,
        ) {
            error!(agent_id = %self.shared.agent_id, error = %e, "failed to record incoming");
        }

        let connector = self.deps.connectors.get(&source);
        let target_id = context.channel_id.clone().unwrap_or_default();
        let typing = match &connector {
            Some(c) => Some(c.start_typing(&target_id).await),
            None => None,
        };

        let routing = context.without_transient();
        let outcome = self.run_tool_loop(&routing).await;

        if let Some(typing) = typing {
            typing.stop().await;
        }

        let now = Utc::now();
        match outcome {
            Ok((text, files)) => {
                self.send_and_record_outgoing(&routing, text, files, Origin::Model, now).await;
            }
            Err(EngineError::NoProvider) => {
                let text = "No inference provider available.".to_owned();
                self.send_and_record_outgoing(&routing, Some(text), Vec::new(), Origin::System, now)
                    .await;
            }
            Err(_) => {
                let text = "Inference failed.".to_owned();
                self.send_and_record_outgoing(&routing, Some(text), Vec::new(), Origin::System, now)
                    .await;
            }
        }
        self.record_state(now).await;
        self.deps
            .event_bus
            .emit(EngineEvent::SessionUpdated { agent_id: self.shared.agent_id.clone() });
    }

    /// The inference+tool loop itself (§4.4 step 4). Returns the final
    /// assistant text/files on success, or the [`EngineError`] to report to
    /// the user on inference failure. Hitting the iteration cap without a
    /// plain-text reply is reported as `Ok` with the cap message, per the
    /// spec treating the cap as a completed (not failed) turn.
    async fn run_tool_loop(
        &self,
        routing: &RoutingContext,
    ) -> Result<(Option<String>, Vec<FileRef>), EngineError> {
        for iteration in 0..MAX_TOOL_LOOP_ITERATIONS {
            let messages = self.shared.state.read().await.messages.clone();
            let tools = self.deps.tools.descriptors();
            let context =
                InferenceContext { messages: &messages, tools: &tools, agent_id: &self.shared.agent_id };
            let outcome = self.deps.inference.complete(&context).await.map_err(|e| {
                if e.0 == "No inference provider available" {
                    EngineError::NoProvider
                } else {
                    EngineError::Internal(e.0)
                }
            })?;

            let assistant_message = outcome.message;
            let has_tool_calls = assistant_message.has_tool_calls();
            let reply_text = assistant_message.text();
            let reply_files = assistant_message.files.clone();
            let tool_calls: Vec<(String, String, serde_json::Value)> = assistant_message
                .tool_calls()
                .into_iter()
                .map(|(id, name, args)| (id.to_owned(), name.to_owned(), args.clone()))
                .collect();

            {
                let mut state = self.shared.state.write().await;
                state.push_message(assistant_message, Utc::now());
            }

            if !has_tool_calls {
                return Ok((Some(reply_text).filter(|t| !t.is_empty()), reply_files));
            }

            for (id, name, arguments) in tool_calls {
                let call = ToolCall { id, name, arguments };
                let permissions = self.shared.state.read().await.permissions.clone();
                let ctx = ToolContext {
                    agent_id: &self.shared.agent_id,
                    permissions: &permissions,
                    routing,
                    connectors: &self.deps.connectors,
                };
                let tool_outcome = self.deps.tools.execute(&call, &ctx).await;
                let mut state = self.shared.state.write().await;
                state.push_message(
                    Message {
                        role: Role::ToolResult,
                        blocks: vec![tool_outcome.result],
                        files: tool_outcome.files,
                    },
                    Utc::now(),
                );
            }

            if iteration + 1 == MAX_TOOL_LOOP_ITERATIONS {
                let text = "Tool execution limit reached.".to_owned();
                {
                    let mut state = self.shared.state.write().await;
                    state.push_message(Message::system_note(&text), Utc::now());
                }
                return Ok((Some(text), Vec::new()));
            }
        }
        unreachable!("loop always returns within MAX_TOOL_LOOP_ITERATIONS iterations")
    }

    async fn send_and_record_outgoing(
        &self,
        routing: &RoutingContext,
        text: Option<String>,
        files: Vec<FileRef>,
        origin: Origin,
        now: chrono::DateTime<Utc>,
    ) {
        if text.is_none() && files.is_empty() {
            return;
        }
        if let Some(connector) = self.deps.connectors.get(&routing.source) {
            let target_id = routing.channel_id.clone().unwrap_or_default();
            let reply =
                OutgoingReply { text: text.clone(), files: files.clone(), reply_to_message_id: None };
            if let Err(e) = connector.send_message(&target_id, reply).await {
                warn!(agent_id = %self.shared.agent_id, error = %e, "connector send failed");
            }
        }
        if let Err(e) = self.deps.store.record_outgoing(
            &self.shared.agent_id,
            &self.shared.storage_id,
            &routing.source,
            None,
            text.clone(),
            files,
            serde_json::to_value(routing).unwrap_or(serde_json::Value::Null),
            origin,
            now,
        ) {
            error!(agent_id = %self.shared.agent_id, error = %e, "failed to record outgoing");
        }
        self.deps.event_bus.emit(EngineEvent::SessionOutgoing {
            agent_id: self.shared.agent_id.clone(),
            text,
        });
    }

    async fn record_state(&self, now: chrono::DateTime<Utc>) {
        let state = self.shared.state.read().await;
        if let Err(e) =
            self.deps.store.record_state(&self.shared.agent_id, &self.shared.storage_id, &state, now)
        {
            error!(agent_id = %self.shared.agent_id, error = %e, "failed to record state snapshot");
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
