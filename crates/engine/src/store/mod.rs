// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable session store: append-only `log.jsonl` plus atomic
//! `descriptor.json`/`state.json` snapshots, one directory per agent under
//! `<dataDir>/agents/<agentId>/`.
//!
//! The append path uses `OpenOptions::create().append()` with no in-memory
//! buffering; `descriptor.json`/`state.json` add atomic-rename snapshots so
//! a load can reconstruct current state without replaying the whole log.

pub mod atomic;
pub mod history;
pub mod log;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::agent_state::AgentState;
use crate::descriptor::AgentDescriptor;
use crate::event::RoutingContext;
use crate::ids::{AgentId, StorageId};
use crate::message::FileRef;

pub use history::AgentHistoryRecord;
pub use log::{LogEntry, LogEntryKind, Origin};

/// An agent restored from disk by [`SessionStore::load_agents`].
#[derive(Debug, Clone)]
pub struct LoadedAgent {
    pub agent_id: AgentId,
    pub storage_id: StorageId,
    pub descriptor: AgentDescriptor,
    pub state: AgentState,
    /// Label of the last entry in `log.jsonl`, if any. The AgentSystem uses
    /// this for the recovery hint: a live-looking agent whose last entry is
    /// `incoming` with no matching `outgoing` needs a synthesized `restore`
    /// item posted at startup.
    pub last_entry_kind: Option<String>,
}

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Filesystem-backed session store rooted at `<dataDir>/agents/`.
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn agent_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.data_dir.join("agents").join(agent_id.as_str())
    }

    fn log_path(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("log.jsonl")
    }

    fn descriptor_path(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("descriptor.json")
    }

    fn state_path(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("state.json")
    }

    fn envelope(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        source: Option<String>,
        message_id: Option<String>,
        at: DateTime<Utc>,
        kind: LogEntryKind,
    ) -> LogEntry {
        LogEntry {
            agent_id: agent_id.clone(),
            storage_id: storage_id.clone(),
            source,
            message_id,
            at,
            kind,
        }
    }

    /// Record the creation of a new session: appends `session_created` and
    /// writes the initial `descriptor.json`.
    pub fn record_session_created(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        descriptor: &AgentDescriptor,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write_descriptor(agent_id, descriptor)?;
        let entry = self.envelope(
            agent_id,
            storage_id,
            None,
            None,
            at,
            LogEntryKind::SessionCreated { descriptor: descriptor.clone(), created_at: at },
        );
        log::append(&self.log_path(agent_id), &entry)?;
        Ok(())
    }

    /// Atomically (re)write `descriptor.json`. Descriptors never change
    /// after creation, but restore paths may rewrite an identical value.
    pub fn write_descriptor(
        &self,
        agent_id: &AgentId,
        descriptor: &AgentDescriptor,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(descriptor)
            .map_err(|e| StoreError(e.to_string()))?;
        atomic::write(&self.descriptor_path(agent_id), &bytes)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_incoming(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        source: &str,
        message_id: Option<String>,
        text: Option<String>,
        files: Vec<FileRef>,
        context: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entry = self.envelope(
            agent_id,
            storage_id,
            Some(source.to_owned()),
            message_id,
            at,
            LogEntryKind::Incoming { text, files, context, received_at: at },
        );
        log::append(&self.log_path(agent_id), &entry)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_outgoing(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        source: &str,
        message_id: Option<String>,
        text: Option<String>,
        files: Vec<FileRef>,
        context: serde_json::Value,
        origin: Origin,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entry = self.envelope(
            agent_id,
            storage_id,
            Some(source.to_owned()),
            message_id,
            at,
            LogEntryKind::Outgoing { text, files, context, origin, sent_at: at },
        );
        log::append(&self.log_path(agent_id), &entry)?;
        Ok(())
    }

    /// Atomically (re)write `state.json` without appending a log entry. Used
    /// to seed the initial snapshot at agent creation, before any turn has
    /// run a `state` entry of its own.
    pub fn write_state(&self, agent_id: &AgentId, state: &AgentState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StoreError(e.to_string()))?;
        atomic::write(&self.state_path(agent_id), &bytes)?;
        Ok(())
    }

    /// Append a `state` entry and atomically rewrite `state.json`.
    pub fn record_state(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        state: &AgentState,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StoreError(e.to_string()))?;
        atomic::write(&self.state_path(agent_id), &bytes)?;
        let entry = self.envelope(
            agent_id,
            storage_id,
            None,
            None,
            at,
            LogEntryKind::State { state: state.clone(), updated_at: at },
        );
        log::append(&self.log_path(agent_id), &entry)?;
        Ok(())
    }

    pub fn record_note(
        &self,
        agent_id: &AgentId,
        storage_id: &StorageId,
        kind: &str,
        text: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entry = self.envelope(
            agent_id,
            storage_id,
            None,
            None,
            at,
            LogEntryKind::Note { kind: kind.to_owned(), text, at },
        );
        log::append(&self.log_path(agent_id), &entry)?;
        Ok(())
    }

    /// Enumerate every persisted agent directory, parsing its descriptor and
    /// state. An agent whose descriptor or state fails to parse is skipped
    /// (logged as corrupt) rather than aborting the whole load — per §7's
    /// corruption class.
    pub fn load_agents(&self) -> Vec<LoadedAgent> {
        let agents_dir = self.data_dir.join("agents");
        let Ok(read_dir) = std::fs::read_dir(&agents_dir) else {
            return Vec::new();
        };
        let mut loaded = Vec::new();
        for entry in read_dir.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let agent_id = AgentId::from_raw(name.clone());
            match self.load_one(&agent_id) {
                Ok(loaded_agent) => loaded.push(loaded_agent),
                Err(e) => warn!(agent_id = %name, error = %e, "skipping corrupt agent on load"),
            }
        }
        loaded
    }

    fn load_one(&self, agent_id: &AgentId) -> Result<LoadedAgent, StoreError> {
        let descriptor_bytes = std::fs::read(self.descriptor_path(agent_id))?;
        let descriptor: AgentDescriptor = serde_json::from_slice(&descriptor_bytes)
            .map_err(|e| StoreError(format!("descriptor.json: {e}")))?;
        let state_bytes = std::fs::read(self.state_path(agent_id))?;
        let mut state: AgentState = serde_json::from_slice(&state_bytes)
            .map_err(|e| StoreError(format!("state.json: {e}")))?;
        let entries = log::read_all(&self.log_path(agent_id))?;
        let last_entry_kind = entries.last().map(|e| e.kind.label().to_owned());
        // A crash between `incoming` and the turn's trailing `state` snapshot
        // leaves `state.json` without the routing context that turn set only
        // in memory. Recover it from the dangling `incoming` entry's own
        // `context` so the restore reply still has somewhere to go.
        if state.routing.is_none() && last_entry_kind.as_deref() == Some("incoming") {
            if let Some(LogEntryKind::Incoming { context, .. }) = entries.last().map(|e| &e.kind) {
                if let Ok(routing) = serde_json::from_value::<RoutingContext>(context.clone()) {
                    state.routing = Some(routing.without_transient());
                }
            }
        }
        let storage_id = entries
            .first()
            .map(|e| e.storage_id.clone())
            .unwrap_or_else(|| StorageId::from_raw(agent_id.as_str()));
        Ok(LoadedAgent { agent_id: agent_id.clone(), storage_id, descriptor, state, last_entry_kind })
    }

    /// Scan `log.jsonl` into its derived [`AgentHistoryRecord`] projection.
    pub fn read_history(&self, agent_id: &AgentId) -> Result<Vec<AgentHistoryRecord>, StoreError> {
        let entries = log::read_all(&self.log_path(agent_id))?;
        Ok(history::project(&entries))
    }

    pub fn files_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("files")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
