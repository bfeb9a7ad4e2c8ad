// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `log.jsonl` entry shapes and the append-only writer/reader for them.
//!
//! `OpenOptions::create().append()` plus one `serde_json::to_string` per
//! line, no in-memory buffering. One file per agent carrying all five entry
//! kinds tagged by `type`.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_state::AgentState;
use crate::descriptor::AgentDescriptor;
use crate::ids::{AgentId, StorageId};
use crate::message::FileRef;

/// Who produced an `outgoing` entry's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Model,
    System,
}

/// The kind-specific body of a log entry, tagged by `type` per §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogEntryKind {
    #[serde(rename = "session_created")]
    SessionCreated { descriptor: AgentDescriptor, created_at: DateTime<Utc> },
    Incoming {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default)]
        files: Vec<FileRef>,
        context: serde_json::Value,
        received_at: DateTime<Utc>,
    },
    Outgoing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default)]
        files: Vec<FileRef>,
        context: serde_json::Value,
        origin: Origin,
        sent_at: DateTime<Utc>,
    },
    State { state: AgentState, updated_at: DateTime<Utc> },
    Note {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        at: DateTime<Utc>,
    },
}

impl LogEntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::Incoming { .. } => "incoming",
            Self::Outgoing { .. } => "outgoing",
            Self::State { .. } => "state",
            Self::Note { .. } => "note",
        }
    }
}

/// One line of `log.jsonl`: the shared envelope plus a tagged [`LogEntryKind`] body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub agent_id: AgentId,
    pub storage_id: StorageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: LogEntryKind,
}

/// Append one entry as a single JSONL line. Returns the serialization or I/O
/// error; callers in the store log and continue rather than propagate, per
/// §7's "transient external" class for disk writes.
pub fn append(path: &Path, entry: &LogEntry) -> std::io::Result<()> {
    let mut line = serde_json::to_string(entry)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push('\n');
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

/// Parse every complete line of a JSONL file into [`LogEntry`]s, in file
/// order. A line that fails to parse is skipped rather than aborting the
/// whole read — this is what lets a trailing partial line (a writer was
/// interrupted mid-append) coexist with a reader running concurrently.
pub fn read_all(path: &Path) -> std::io::Result<Vec<LogEntry>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<LogEntry>(line).ok())
        .collect())
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
