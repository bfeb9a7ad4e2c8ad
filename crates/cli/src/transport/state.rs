// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared axum state.

use std::sync::Arc;

use cohort_engine::agent_system::AgentSystem;

#[derive(Clone)]
pub struct AppState {
    pub system: Arc<AgentSystem>,
    pub auth_token: Option<String>,
}
