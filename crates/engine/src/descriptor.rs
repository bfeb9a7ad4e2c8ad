// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity: the immutable [`AgentDescriptor`], its canonical
//! [`AgentKey`], and the mutable [`Permissions`] grant set.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Immutable identity record of an agent. Two descriptors are equal iff all
/// their fields match; a descriptor never changes after the agent is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AgentDescriptor {
    User { connector: String, user_id: String, channel_id: String },
    Cron { id: String },
    Heartbeat,
    Subagent { id: String, parent_agent_id: String, name: String },
}

impl AgentDescriptor {
    /// The canonical reverse-lookup key for this descriptor, if it has one.
    /// Only `User` and `Heartbeat` descriptors are addressable by key;
    /// `Subagent` and `Cron` are addressed only by [`crate::ids::AgentId`].
    pub fn key(&self) -> Option<AgentKey> {
        match self {
            Self::User { connector, channel_id, user_id } => {
                Some(AgentKey(format!("user:{connector}:{channel_id}:{user_id}")))
            }
            Self::Heartbeat => Some(AgentKey("heartbeat".to_owned())),
            Self::Cron { .. } | Self::Subagent { .. } => None,
        }
    }

    /// The id-space this descriptor belongs to, used for routing background
    /// spawns and cron tasks that prefer a stable id derived from the
    /// descriptor itself (rather than a freshly minted one).
    pub fn stable_hint(&self) -> Option<String> {
        match self {
            Self::Cron { id } => Some(format!("cron:{id}")),
            Self::Subagent { id, .. } => Some(format!("subagent:{id}")),
            Self::User { .. } | Self::Heartbeat => None,
        }
    }
}

/// Canonical string key derived from a [`AgentDescriptor`] for fast reverse
/// lookup in the [`crate::agent_system::AgentSystem`]'s descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKey(String);

impl AgentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cron(task_id: &str) -> Self {
        Self(format!("cron:{task_id}"))
    }
}

impl std::fmt::Display for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The access grants held by an agent. Paths are always absolute and
/// canonicalized before being stored; mutated only by applying a
/// [`PermissionDecision`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub working_dir: Option<PathBuf>,
    pub write_dirs: BTreeSet<PathBuf>,
    pub read_dirs: BTreeSet<PathBuf>,
    pub web: bool,
}

/// What kind of access a [`PermissionDecision`] grants or revokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AccessGrant {
    Web,
    Read { path: PathBuf },
    Write { path: PathBuf },
}

impl AccessGrant {
    /// Ordering key used to apply decisions `web -> read -> write`.
    fn order(&self) -> u8 {
        match self {
            Self::Web => 0,
            Self::Read { .. } => 1,
            Self::Write { .. } => 2,
        }
    }
}

/// A single permission change requested by a connector or the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub approved: bool,
    pub access: AccessGrant,
}

/// Error applying a [`PermissionDecision`]: the path was not absolute once
/// canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNotAbsolute(pub PathBuf);

impl std::fmt::Display for PathNotAbsolute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path is not absolute: {}", self.0.display())
    }
}

impl Permissions {
    /// Apply a batch of decisions in the required order (`web -> read ->
    /// write`), rejecting any path-carrying decision whose path is not
    /// absolute. Decisions are applied best-effort: a rejected decision is
    /// skipped and its error is collected, other decisions still apply.
    pub fn apply_all(
        &mut self,
        mut decisions: Vec<PermissionDecision>,
    ) -> Vec<PathNotAbsolute> {
        decisions.sort_by_key(|d| d.access.order());
        let mut errors = Vec::new();
        for decision in decisions {
            if let Err(e) = self.apply(decision) {
                errors.push(e);
            }
        }
        errors
    }

    fn apply(&mut self, decision: PermissionDecision) -> Result<(), PathNotAbsolute> {
        match decision.access {
            AccessGrant::Web => {
                self.web = decision.approved;
                Ok(())
            }
            AccessGrant::Read { path } => {
                if !path.is_absolute() {
                    return Err(PathNotAbsolute(path));
                }
                if decision.approved {
                    self.read_dirs.insert(path);
                } else {
                    self.read_dirs.remove(&path);
                }
                Ok(())
            }
            AccessGrant::Write { path } => {
                if !path.is_absolute() {
                    return Err(PathNotAbsolute(path));
                }
                if decision.approved {
                    self.write_dirs.insert(path);
                } else {
                    self.write_dirs.remove(&path);
                }
                Ok(())
            }
        }
    }

    /// Whether `path` falls under a granted write directory.
    pub fn can_write(&self, path: &Path) -> bool {
        self.write_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Whether `path` falls under a granted read directory (write implies read).
    pub fn can_read(&self, path: &Path) -> bool {
        self.can_write(path) || self.read_dirs.iter().any(|dir| path.starts_with(dir))
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
