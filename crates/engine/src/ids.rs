// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque identifiers for agents and their on-disk storage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an agent, valid for its entire lifetime.
///
/// Generated as a 32-character lowercase hex string (a UUIDv4 with the
/// hyphens stripped), which satisfies the 24-32 char lowercase-alphanumeric
/// contract without inventing a bespoke alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

/// Identifier naming the on-disk log file for a session. One-to-one with
/// an [`AgentId`]; never reused even if the owning agent is reset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(String);

fn mint() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

macro_rules! opaque_id {
    ($ty:ident) => {
        impl $ty {
            /// Mint a fresh, globally-unique id.
            pub fn new() -> Self {
                Self(mint())
            }

            /// Wrap an existing id string read back from storage.
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(AgentId);
opaque_id!(StorageId);

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
