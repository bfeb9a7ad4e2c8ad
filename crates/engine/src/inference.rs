// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inference router contract (§4.6): an ordered provider list with
//! fallback on client-construction failure only.
//!
//! A provider is only skipped when *instantiating* it fails (bad
//! credentials, missing registration); once a client is live, a runtime
//! error from `complete` is never retried against the next provider. Attempt
//! telemetry is a plain `Vec<Telemetry>` the caller inspects after the fact,
//! rather than a visitor the router invokes.

use async_trait::async_trait;
use tracing::warn;

use crate::ids::AgentId;
use crate::message::Message;

/// Static provider configuration, replaced wholesale by [`InferenceRouter::update_providers`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub model: String,
    pub options: serde_json::Value,
}

/// Everything a client needs to produce the next assistant message.
pub struct InferenceContext<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescriptor],
    pub agent_id: &'a AgentId,
}

/// A tool's name/description/schema, as surfaced to an inference client.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct InferenceError(pub String);

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inference error: {}", self.0)
    }
}

impl std::error::Error for InferenceError {}

/// A live, ready-to-call inference backend, returned by an
/// [`InferenceProvider`]'s `create_client`.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn model_id(&self) -> &str;
    async fn complete(&self, context: &InferenceContext<'_>) -> Result<Message, InferenceError>;
}

/// A registered provider kind (e.g. "anthropic", "openai"), capable of
/// instantiating a client for a given [`ProviderConfig`].
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn id(&self) -> &str;
    async fn create_client(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn InferenceClient>, InferenceError>;
}

/// Structured telemetry — one entry per provider considered during a
/// `complete` call.
#[derive(Debug, Clone)]
pub enum Telemetry {
    Attempt { provider_id: String },
    Fallback { provider_id: String, reason: String },
    Success { provider_id: String, model_id: String },
    Failure { provider_id: String, error: String },
}

/// Outcome of a successful [`InferenceRouter::complete`] call.
pub struct CompleteOutcome {
    pub provider_id: String,
    pub model_id: String,
    pub message: Message,
    pub telemetry: Vec<Telemetry>,
}

/// Ordered provider list plus the registry of provider kinds that can
/// instantiate a client for a config entry.
pub struct InferenceRouter {
    registry: std::collections::HashMap<String, std::sync::Arc<dyn InferenceProvider>>,
    providers: tokio::sync::RwLock<Vec<ProviderConfig>>,
}

impl InferenceRouter {
    pub fn new(registry: Vec<std::sync::Arc<dyn InferenceProvider>>) -> Self {
        let registry = registry.into_iter().map(|p| (p.id().to_owned(), p)).collect();
        Self { registry, providers: tokio::sync::RwLock::new(Vec::new()) }
    }

    /// Atomically replace the active provider list. Safe to call between
    /// turns; never observed mid-`complete` since the read lock is held only
    /// for the duration of one `complete` call.
    pub async fn update_providers(&self, list: Vec<ProviderConfig>) {
        *self.providers.write().await = list;
    }

    /// Try each configured provider in order until one yields a message.
    ///
    /// A provider whose kind isn't registered, or whose client fails to
    /// construct, is skipped with a `Fallback` telemetry entry and the loop
    /// continues. The first provider whose client is constructed has its
    /// `complete` error surfaced directly — a runtime failure never triggers
    /// rotation to the next provider.
    pub async fn complete(
        &self,
        context: &InferenceContext<'_>,
    ) -> Result<CompleteOutcome, InferenceError> {
        let providers = self.providers.read().await.clone();
        let mut telemetry = Vec::new();
        for config in &providers {
            telemetry.push(Telemetry::Attempt { provider_id: config.id.clone() });
            let Some(provider) = self.registry.get(&config.id) else {
                let reason = "provider kind not registered".to_owned();
                warn!(provider_id = %config.id, "skipping unregistered provider");
                telemetry.push(Telemetry::Fallback { provider_id: config.id.clone(), reason });
                continue;
            };
            let client = match provider.create_client(config).await {
                Ok(client) => client,
                Err(e) => {
                    warn!(provider_id = %config.id, error = %e, "provider client construction failed");
                    telemetry.push(Telemetry::Fallback {
                        provider_id: config.id.clone(),
                        reason: e.0,
                    });
                    continue;
                }
            };
            return match client.complete(context).await {
                Ok(message) => {
                    telemetry.push(Telemetry::Success {
                        provider_id: config.id.clone(),
                        model_id: client.model_id().to_owned(),
                    });
                    Ok(CompleteOutcome {
                        provider_id: config.id.clone(),
                        model_id: client.model_id().to_owned(),
                        message,
                        telemetry,
                    })
                }
                Err(e) => {
                    telemetry.push(Telemetry::Failure {
                        provider_id: config.id.clone(),
                        error: e.0.clone(),
                    });
                    Err(e)
                }
            };
        }
        Err(InferenceError("No inference provider available".to_owned()))
    }
}

#[cfg(test)]
#[path = "inference_tests.rs"]
mod tests;
