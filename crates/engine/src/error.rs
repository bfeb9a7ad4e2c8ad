// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-wide error taxonomy.
//!
//! A hand-written `Copy` enum with `Display`/`as_str`/`http_status`, not a
//! `thiserror`-derived type. Library boundaries (store, inbox, agent) return
//! their own small error enums; `EngineError` is what those convert into
//! once they cross into agent-system-level or transport-level code.

use std::fmt;

/// The five error classes named in the error-handling design. Only
/// `ProgrammingInvariant` is allowed to escape an agent turn; every other
/// class is converted to user-visible text and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    TransientExternal,
    Corruption,
    ProgrammingInvariant,
    FatalConnector,
}

/// Engine-level error. Each variant names both its class and a stable wire
/// code so transports can render a consistent machine-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Agent id does not resolve to a known `AgentEntry`.
    AgentNotFound(String),
    /// A permission-decision path was not absolute once canonicalized.
    PathNotAbsolute(String),
    /// Tool name not present in the resolver's registry.
    UnknownTool(String),
    /// An inbox item failed a structural check that should never occur
    /// outside a bug (unknown item type, duplicate registration).
    Invariant(String),
    /// No inference provider produced a message.
    NoProvider,
    /// Internal failure with no more specific class.
    Internal(String),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::AgentNotFound(_) | Self::PathNotAbsolute(_) | Self::UnknownTool(_) => {
                ErrorClass::Validation
            }
            Self::NoProvider => ErrorClass::TransientExternal,
            Self::Invariant(_) => ErrorClass::ProgrammingInvariant,
            Self::Internal(_) => ErrorClass::TransientExternal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "AGENT_NOT_FOUND",
            Self::PathNotAbsolute(_) => "PATH_NOT_ABSOLUTE",
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::Invariant(_) => "INVARIANT_VIOLATION",
            Self::NoProvider => "NO_PROVIDER",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// The user-visible text a turn should send when this error surfaces
    /// mid-turn, per §4.4's failure-handling rules. Only meaningful for the
    /// `TransientExternal` class; other classes are not meant to reach a
    /// connector send.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoProvider => "No inference provider available.",
            _ => "Internal error.",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentNotFound(id) => write!(f, "agent not found: {id}"),
            Self::PathNotAbsolute(path) => write!(f, "path is not absolute: {path}"),
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::Invariant(msg) => write!(f, "invariant violation: {msg}"),
            Self::NoProvider => write!(f, "no inference provider available"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
