// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /v1/health` and `GET /v1/ready`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::transport::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agents: usize,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
}

/// `GET /v1/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let agents = state.system.list_agents().await.len();
    Json(HealthResponse { status: "ok", agents })
}

/// `GET /v1/ready`. The router is only bound after `AgentSystem::load` and
/// `start` complete, so reaching this handler at all implies readiness.
pub async fn ready(State(_state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    (StatusCode::OK, Json(ReadyResponse { ready: true }))
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
