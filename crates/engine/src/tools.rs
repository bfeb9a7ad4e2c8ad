// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool resolver contract (§4.7): name → schema-validated executable,
//! never throwing to the caller.
//!
//! Tools are registered trait objects in a plain map, resolved by name per
//! call.

use async_trait::async_trait;

use crate::connector::ConnectorRegistry;
use crate::descriptor::Permissions;
use crate::event::RoutingContext;
use crate::ids::AgentId;
use crate::inference::ToolDescriptor;
use crate::message::{ContentBlock, FileRef};

/// Everything a tool needs to execute one call: the calling agent's
/// identity, its current permissions, the message's routing context, and
/// the connector registry (for tools that themselves notify a connector).
pub struct ToolContext<'a> {
    pub agent_id: &'a AgentId,
    pub permissions: &'a Permissions,
    pub routing: &'a RoutingContext,
    pub connectors: &'a ConnectorRegistry,
}

/// A single `toolCall` as extracted from an assistant message.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The result of executing one tool call: always a `toolResult` content
/// block plus any file references it generated, never an exception.
pub struct ToolOutcome {
    pub result: ContentBlock,
    pub files: Vec<FileRef>,
}

impl ToolOutcome {
    pub fn ok(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            result: ContentBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                is_error: false,
                text: text.into(),
            },
            files: Vec::new(),
        }
    }

    pub fn error(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            result: ContentBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                is_error: true,
                text: text.into(),
            },
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }
}

/// A named, schema-validated tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;

    /// Execute the call. Must never panic across this boundary — any
    /// internal failure should already be converted to an error
    /// [`ToolOutcome`] by the implementation; [`ToolResolver::execute`]
    /// additionally catches argument-validation failures before calling
    /// this.
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext<'_>) -> ToolOutcome;
}

/// Registry mapping tool name to implementation.
#[derive(Default)]
pub struct ToolResolver {
    tools: std::collections::HashMap<String, std::sync::Arc<dyn Tool>>,
}

impl ToolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: std::sync::Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// The active tool set, for advertising to an inference provider.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_owned(),
                description: t.description().to_owned(),
                schema: t.schema(),
            })
            .collect()
    }

    /// Resolve and execute one call. An unknown tool name, or arguments that
    /// fail basic schema validation, becomes an error `toolResult` rather
    /// than propagating — per §4.7, every path through here returns a
    /// `toolResult`.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext<'_>) -> ToolOutcome {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolOutcome::error(&call.id, format!("Unknown tool: {}", call.name));
        };
        if let Err(reason) = validate_arguments(&tool.schema(), &call.arguments) {
            return ToolOutcome::error(&call.id, reason);
        }
        tool.execute(call, ctx).await
    }
}

/// Minimal structural validation: every property the schema marks
/// `required` must be present in `arguments`. Full JSON Schema validation is
/// outside this crate's scope; tools that need more should validate inside
/// their own `execute`.
fn validate_arguments(schema: &serde_json::Value, arguments: &serde_json::Value) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(|r| r.as_array()) else {
        return Ok(());
    };
    for field in required {
        let Some(name) = field.as_str() else { continue };
        if arguments.get(name).is_none() {
            return Err(format!("missing required argument: {name}"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
