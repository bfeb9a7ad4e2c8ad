// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::RwLock;

use super::*;
use crate::agent_state::AgentState;
use crate::connector::{ConnectorError, OutgoingReply, TypingHandle};
use crate::descriptor::{AccessGrant, AgentDescriptor, PermissionDecision};
use crate::event::EngineEvent;
use crate::ids::{AgentId, StorageId};
use crate::inbox::Inbox;
use crate::inference::{InferenceClient, InferenceError, InferenceProvider, ProviderConfig};
use crate::message::ContentBlock;
use crate::store::SessionStore;
use crate::tools::{Tool, ToolOutcome};

struct NoopTyping;
#[async_trait]
impl TypingHandle for NoopTyping {
    async fn stop(self: Box<Self>) {}
}

struct RecordingConnector {
    sent: std::sync::Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl crate::connector::Connector for RecordingConnector {
    fn name(&self) -> &str {
        "test"
    }
    async fn send_message(&self, _target_id: &str, reply: OutgoingReply) -> Result<(), ConnectorError> {
        self.sent.lock().unwrap().push(reply.text);
        Ok(())
    }
    async fn start_typing(&self, _target_id: &str) -> Box<dyn TypingHandle> {
        Box::new(NoopTyping)
    }
}

/// Replies with a tool call on the first turn it sees a message containing
/// "use-tool", then a plain final reply on the next.
struct ScriptedClient;

#[async_trait]
impl InferenceClient for ScriptedClient {
    fn model_id(&self) -> &str {
        "scripted"
    }
    async fn complete(
        &self,
        context: &crate::inference::InferenceContext<'_>,
    ) -> Result<Message, InferenceError> {
        let already_called_tool = context.messages.iter().any(|m| m.role == Role::ToolResult);
        if already_called_tool {
            return Ok(Message::assistant(vec![ContentBlock::Text { text: "done".into() }]));
        }
        let wants_tool = context.messages.iter().any(|m| m.text().contains("use-tool"));
        if wants_tool {
            return Ok(Message::assistant(vec![ContentBlock::ToolCall {
                tool_call_id: "t1".into(),
                name: "echo".into(),
                arguments: serde_json::json!({"message": "hi"}),
            }]));
        }
        Ok(Message::assistant(vec![ContentBlock::Text { text: "echo reply".into() }]))
    }
}

struct ScriptedProvider;
#[async_trait]
impl InferenceProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }
    async fn create_client(
        &self,
        _config: &ProviderConfig,
    ) -> Result<Box<dyn InferenceClient>, InferenceError> {
        Ok(Box::new(ScriptedClient))
    }
}

/// Always replies with a tool call, never a plain final reply, to drive the
/// iteration cap.
struct LoopingClient;

#[async_trait]
impl InferenceClient for LoopingClient {
    fn model_id(&self) -> &str {
        "looping"
    }
    async fn complete(
        &self,
        _context: &crate::inference::InferenceContext<'_>,
    ) -> Result<Message, InferenceError> {
        Ok(Message::assistant(vec![ContentBlock::ToolCall {
            tool_call_id: "t1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"message": "hi"}),
        }]))
    }
}

struct LoopingProvider;
#[async_trait]
impl InferenceProvider for LoopingProvider {
    fn id(&self) -> &str {
        "looping"
    }
    async fn create_client(
        &self,
        _config: &ProviderConfig,
    ) -> Result<Box<dyn InferenceClient>, InferenceError> {
        Ok(Box::new(LoopingClient))
    }
}

struct EchoTool;
#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "echo"
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, call: &crate::tools::ToolCall, _ctx: &ToolContext<'_>) -> ToolOutcome {
        ToolOutcome::ok(&call.id, "tool ran")
    }
}

async fn test_runner(descriptor: AgentDescriptor, connector: Arc<RecordingConnector>) -> (AgentRunner, Inbox) {
    test_runner_with_provider(descriptor, connector, Arc::new(ScriptedProvider), "scripted").await
}

async fn test_runner_with_provider(
    descriptor: AgentDescriptor,
    connector: Arc<RecordingConnector>,
    provider: Arc<dyn InferenceProvider>,
    provider_id: &str,
) -> (AgentRunner, Inbox) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SessionStore::new(dir.into_path()));
    let event_bus = Arc::new(crate::event_bus::EventBus::new());
    let mut connectors = crate::connector::ConnectorRegistry::new();
    connectors.register(connector);
    let inference = Arc::new(crate::inference::InferenceRouter::new(vec![provider]));
    inference
        .update_providers(vec![ProviderConfig {
            id: provider_id.to_owned(),
            model: "m".into(),
            options: serde_json::json!({}),
        }])
        .await;
    let mut tools = crate::tools::ToolResolver::new();
    tools.register(Arc::new(EchoTool));

    let deps = AgentDeps {
        store,
        event_bus,
        connectors: Arc::new(connectors),
        inference,
        tools: Arc::new(tools),
    };
    let agent_id = AgentId::new();
    let storage_id = StorageId::new();
    let now = chrono::Utc::now();
    let state = AgentState::new(descriptor, now);
    let (inbox, consumer) = Inbox::channel();
    let shared = Arc::new(Shared {
        agent_id,
        storage_id,
        state: RwLock::new(state),
        is_processing: AtomicBool::new(false),
        needs_restore_reply: AtomicBool::new(false),
    });
    (AgentRunner { shared, consumer, deps }, inbox)
}

fn routing(source: &str) -> RoutingContext {
    RoutingContext {
        source: source.to_owned(),
        channel_id: Some("C1".into()),
        user_id: Some("U1".into()),
        message_id: Some("M1".into()),
        task_id: None,
    }
}

#[tokio::test]
async fn message_without_tool_call_records_single_outgoing() {
    let connector = Arc::new(RecordingConnector { sent: std::sync::Mutex::new(vec![]) });
    let (runner, inbox) = test_runner(AgentDescriptor::Heartbeat, connector.clone()).await;
    inbox.post(InboxItem::Message {
        message: Message::user_text("hello"),
        source: "test".into(),
        context: routing("test"),
    });
    drop(inbox);
    runner.run().await;

    let sent = connector.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], Some("echo reply".to_owned()));
}

#[tokio::test]
async fn message_with_tool_call_runs_tool_before_final_reply() {
    let connector = Arc::new(RecordingConnector { sent: std::sync::Mutex::new(vec![]) });
    let (runner, inbox) = test_runner(AgentDescriptor::Heartbeat, connector.clone()).await;
    inbox.post(InboxItem::Message {
        message: Message::user_text("please use-tool now"),
        source: "test".into(),
        context: routing("test"),
    });
    drop(inbox);
    runner.run().await;

    let sent = connector.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], Some("done".to_owned()));
}

#[tokio::test]
async fn reset_clears_messages_and_emits_event() {
    let connector = Arc::new(RecordingConnector { sent: std::sync::Mutex::new(vec![]) });
    let (runner, inbox) = test_runner(AgentDescriptor::Heartbeat, connector.clone()).await;
    let mut events = runner.deps.event_bus.subscribe();
    inbox.post(InboxItem::Message {
        message: Message::user_text("hello"),
        source: "test".into(),
        context: routing("test"),
    });
    inbox.post(InboxItem::Reset { source: "test".into() });
    drop(inbox);
    runner.run().await;

    let mut saw_reset = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::AgentReset { .. }) {
            saw_reset = true;
        }
    }
    assert!(saw_reset);
}

#[tokio::test]
async fn permission_decision_updates_state_without_outgoing() {
    let connector = Arc::new(RecordingConnector { sent: std::sync::Mutex::new(vec![]) });
    let (runner, inbox) = test_runner(AgentDescriptor::Heartbeat, connector.clone()).await;
    let shared = runner.shared.clone();
    inbox.post(InboxItem::PermissionDecision {
        decision: PermissionDecision { approved: true, access: AccessGrant::Web },
        source: "test".into(),
        context: routing("test"),
    });
    drop(inbox);
    runner.run().await;

    assert!(shared.state.read().await.permissions.web);
    assert!(connector.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn hitting_the_tool_iteration_cap_appends_a_system_note() {
    let connector = Arc::new(RecordingConnector { sent: std::sync::Mutex::new(vec![]) });
    let (runner, inbox) =
        test_runner_with_provider(AgentDescriptor::Heartbeat, connector.clone(), Arc::new(LoopingProvider), "looping")
            .await;
    let shared = runner.shared.clone();
    inbox.post(InboxItem::Message {
        message: Message::user_text("please use-tool now"),
        source: "test".into(),
        context: routing("test"),
    });
    drop(inbox);
    runner.run().await;

    let sent = connector.sent.lock().unwrap();
    assert_eq!(sent.last().unwrap(), &Some("Tool execution limit reached.".to_owned()));
    drop(sent);

    let state = shared.state.read().await;
    let last = state.messages.last().expect("at least one message");
    assert_eq!(last.role, Role::SystemNote);
    assert_eq!(last.text(), "Tool execution limit reached.");
}
