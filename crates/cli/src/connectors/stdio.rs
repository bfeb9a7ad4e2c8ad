// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A line-oriented stdin/stdout connector, the minimal reference
//! implementation used for local development and the `cohort` binary's
//! default run mode.
//!
//! Per the connector contract's inverted delivery model, ingestion is not
//! part of the [`Connector`] trait itself: [`spawn_ingest`] drives its own
//! read loop and calls [`AgentSystem::schedule_message`] directly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use cohort_engine::agent_system::AgentSystem;
use cohort_engine::connector::{Connector, ConnectorError, OutgoingReply, TypingHandle};
use cohort_engine::event::RoutingContext;
use cohort_engine::message::Message;

pub const SOURCE: &str = "stdio";

pub struct StdioConnector;

struct StdioTyping;

#[async_trait]
impl TypingHandle for StdioTyping {
    async fn stop(self: Box<Self>) {}
}

#[async_trait]
impl Connector for StdioConnector {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn send_message(&self, target_id: &str, reply: OutgoingReply) -> Result<(), ConnectorError> {
        if let Some(text) = reply.text {
            println!("[{target_id}] {text}");
        }
        for file in reply.files {
            println!("[{target_id}] (attachment: {})", file.path);
        }
        Ok(())
    }

    async fn start_typing(&self, target_id: &str) -> Box<dyn TypingHandle> {
        info!(target_id, "agent is thinking...");
        Box::new(StdioTyping)
    }
}

/// Read newline-delimited prompts from stdin, one user message per line,
/// scheduling each against `system` under a single fixed user/channel key so
/// a whole REPL session maps to one agent.
pub async fn spawn_ingest(system: Arc<AgentSystem>, user_id: String, channel_id: String) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let context = RoutingContext {
                    source: SOURCE.to_owned(),
                    channel_id: Some(channel_id.clone()),
                    user_id: Some(user_id.clone()),
                    message_id: None,
                    task_id: None,
                };
                system.schedule_message(SOURCE, Message::user_text(trimmed), context).await;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdio ingest: read error, stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "stdio_tests.rs"]
mod tests;
