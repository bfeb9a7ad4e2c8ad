// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message content model: ordered content blocks attributed to a role.

use serde::{Deserialize, Serialize};

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    ToolResult,
    #[serde(rename = "system-note")]
    SystemNote,
}

/// A reference to a file generated or attached during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    Text { text: String },
    ToolCall { tool_call_id: String, name: String, arguments: serde_json::Value },
    ToolResult { tool_call_id: String, is_error: bool, text: String },
}

/// An ordered sequence of content blocks attributed to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: Role::User, blocks: vec![ContentBlock::Text { text: text.into() }], files: vec![] }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self { role: Role::Assistant, blocks, files: vec![] }
    }

    pub fn system_note(text: impl Into<String>) -> Self {
        Self {
            role: Role::SystemNote,
            blocks: vec![ContentBlock::Text { text: text.into() }],
            files: vec![],
        }
    }

    /// Concatenate all text blocks with `\n`, per the turn algorithm's
    /// "extract assistant text" step.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All `toolCall` blocks, in declaration order.
    pub fn tool_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolCall { tool_call_id, name, arguments } => {
                    Some((tool_call_id.as_str(), name.as_str(), arguments))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, ContentBlock::ToolCall { .. }))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
