// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only agent introspection and reset: status and history handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use cohort_engine::descriptor::AgentDescriptor;
use cohort_engine::ids::AgentId;
use cohort_engine::store::AgentHistoryRecord;

use crate::error::ErrorCode;
use crate::transport::state::AppState;
use crate::transport::ErrorResponse;

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub descriptor: AgentDescriptor,
    pub updated_at: DateTime<Utc>,
    pub is_processing: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// `GET /v1/agents`
pub async fn list(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let agents = state.system.list_agents().await;
    let body = agents
        .into_iter()
        .map(|(id, descriptor, updated_at, is_processing)| AgentSummary {
            agent_id: id.as_str().to_owned(),
            descriptor,
            updated_at,
            is_processing,
        })
        .collect();
    Json(body)
}

/// `GET /v1/agents/:id/history`
pub async fn history(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Vec<AgentHistoryRecord>>, ApiError> {
    let agent_id = AgentId::from_raw(agent_id);
    state
        .system
        .store()
        .read_history(&agent_id)
        .map(Json)
        .map_err(|e| ErrorCode::Internal.to_http_response(e.0))
}

/// `POST /v1/agents/:id/reset`
pub async fn reset(State(state): State<AppState>, Path(agent_id): Path<String>) -> Json<ResetResponse> {
    let agent_id = AgentId::from_raw(agent_id);
    state.system.reset(&agent_id).await;
    Json(ResetResponse { ok: true })
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
