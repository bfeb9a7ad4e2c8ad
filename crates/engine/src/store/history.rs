// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection of a raw `log.jsonl` scan into [`AgentHistoryRecord`]s — the
//! read-side view named in §3. Derived, not primary: never written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::AgentDescriptor;
use crate::message::{ContentBlock, FileRef};

use super::log::{LogEntry, LogEntryKind, Origin};

/// One human-meaningful entry in an agent's history, derived from a
/// [`LogEntry`]. Unlike `LogEntry`, this intentionally drops the envelope
/// fields not needed for display (storage id, raw context blob).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AgentHistoryRecord {
    Start { descriptor: AgentDescriptor, at: DateTime<Utc> },
    Reset { at: DateTime<Utc> },
    UserMessage { text: Option<String>, files: Vec<FileRef>, at: DateTime<Utc> },
    AssistantMessage { text: Option<String>, files: Vec<FileRef>, origin: Origin, at: DateTime<Utc> },
    ToolResult { text: Option<String>, at: DateTime<Utc> },
    Note { text: Option<String>, at: DateTime<Utc> },
}

/// Turn a raw log scan into the derived history view.
///
/// `state` entries carry no direct record of their own, but they are the
/// only place `toolResult` content blocks are visible (the log has no
/// dedicated entry kind for them). Each `state` snapshot's messages are
/// scanned for `toolResult` blocks not already accounted for by an earlier
/// snapshot, and any new ones become `tool_result` records timestamped at
/// that snapshot.
pub fn project(entries: &[LogEntry]) -> Vec<AgentHistoryRecord> {
    let mut records = Vec::new();
    let mut tool_results_seen = 0usize;
    for entry in entries {
        match &entry.kind {
            LogEntryKind::SessionCreated { descriptor, created_at } => {
                records.push(AgentHistoryRecord::Start {
                    descriptor: descriptor.clone(),
                    at: *created_at,
                });
            }
            LogEntryKind::Incoming { text, files, received_at, .. } => {
                records.push(AgentHistoryRecord::UserMessage {
                    text: text.clone(),
                    files: files.clone(),
                    at: *received_at,
                });
            }
            LogEntryKind::Outgoing { text, files, origin, sent_at, .. } => {
                records.push(AgentHistoryRecord::AssistantMessage {
                    text: text.clone(),
                    files: files.clone(),
                    origin: *origin,
                    at: *sent_at,
                });
            }
            LogEntryKind::State { state, updated_at } => {
                let tool_results: Vec<&str> = state
                    .messages
                    .iter()
                    .flat_map(|m| m.blocks.iter())
                    .filter_map(|b| match b {
                        ContentBlock::ToolResult { text, .. } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                for text in tool_results.iter().skip(tool_results_seen) {
                    records.push(AgentHistoryRecord::ToolResult {
                        text: Some((*text).to_owned()),
                        at: *updated_at,
                    });
                }
                tool_results_seen = tool_results.len();
            }
            LogEntryKind::Note { kind, text, at } if kind == "reset" => {
                records.push(AgentHistoryRecord::Reset { at: *at });
            }
            LogEntryKind::Note { text, at, .. } => {
                records.push(AgentHistoryRecord::Note { text: text.clone(), at: *at });
            }
        }
    }
    records
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
