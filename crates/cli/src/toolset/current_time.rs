// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `current_time`: returns the current UTC time. Takes no arguments; exists
//! mainly to give the turn loop's tool-call path something deterministic to
//! call in tests and local development.

use async_trait::async_trait;
use chrono::Utc;

use cohort_engine::tools::{Tool, ToolCall, ToolContext, ToolOutcome};

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Return the current UTC time in RFC 3339 format."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": [],
        })
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext<'_>) -> ToolOutcome {
        ToolOutcome::ok(&call.id, Utc::now().to_rfc3339())
    }
}

#[cfg(test)]
#[path = "current_time_tests.rs"]
mod tests;
