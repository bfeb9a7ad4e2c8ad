// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connector contract (§6): the external transport adapter a
//! [`crate::agent::Agent`] calls out to for sending replies, typing
//! indicators, and permission prompts.
//!
//! The spec's `onMessage(handler) -> unsubscribe` is callback-shaped; per
//! the design notes' guidance to reshape "callback-heavy lifecycle" APIs,
//! inbound delivery is inverted here: a connector implementation drives its
//! own ingestion loop and calls `AgentSystem::schedule_message` directly,
//! rather than registering a handler the core invokes. This trait only
//! covers the core-to-connector direction (send, typing, permission,
//! shutdown).

use async_trait::async_trait;

use crate::descriptor::{AgentDescriptor, PermissionDecision};
use crate::message::FileRef;

/// A reply the core wants delivered to a connector target.
#[derive(Debug, Clone, Default)]
pub struct OutgoingReply {
    pub text: Option<String>,
    pub files: Vec<FileRef>,
    pub reply_to_message_id: Option<String>,
}

/// A permission prompt the core wants surfaced to the connector's user.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub summary: String,
    pub access: crate::descriptor::AccessGrant,
}

/// Why a connector send or permission request failed.
#[derive(Debug, Clone)]
pub struct ConnectorError(pub String);

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connector error: {}", self.0)
    }
}

impl std::error::Error for ConnectorError {}

/// A running typing/status indicator. Dropping without calling [`Self::stop`]
/// is allowed; implementations should clear the indicator on drop as a
/// fallback, but `stop` lets a caller await confirmation.
#[async_trait]
pub trait TypingHandle: Send {
    async fn stop(self: Box<Self>);
}

/// External transport adapter. One implementation per chat/webhook/cron
/// surface; the engine holds these behind a [`ConnectorRegistry`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable name matching the `source` field used in routing (e.g. `"chat-x"`).
    fn name(&self) -> &str;

    async fn send_message(
        &self,
        target_id: &str,
        reply: OutgoingReply,
    ) -> Result<(), ConnectorError>;

    /// Start a typing/status indicator. Best-effort: failures should be
    /// logged by the implementation, not propagated.
    async fn start_typing(&self, target_id: &str) -> Box<dyn TypingHandle>;

    /// Ask the connector to surface a permission prompt to its user.
    /// `None` means the connector has no interactive surface for this and
    /// the request should be treated as not (yet) decided.
    async fn request_permission(
        &self,
        _target_id: &str,
        _request: PermissionRequest,
        _descriptor: &AgentDescriptor,
    ) -> Option<PermissionDecision> {
        None
    }

    /// Best-effort shutdown notice; does not itself stop the engine.
    async fn shutdown(&self, _reason: &str) {}
}

/// Lookup table of connectors by `source` name, shared read-only across agents.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: std::collections::HashMap<String, std::sync::Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: std::sync::Arc<dyn Connector>) {
        self.connectors.insert(connector.name().to_owned(), connector);
    }

    pub fn get(&self, source: &str) -> Option<std::sync::Arc<dyn Connector>> {
        self.connectors.get(source).cloned()
    }
}

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
