// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use cohort_engine::agent::AgentDeps;
use cohort_engine::agent_system::AgentSystem;
use cohort_engine::connector::ConnectorRegistry;
use cohort_engine::event_bus::EventBus;
use cohort_engine::inference::InferenceRouter;
use cohort_engine::store::SessionStore;
use cohort_engine::tools::ToolResolver;
use tempfile::TempDir;

use super::*;
use crate::transport::state::AppState;

async fn test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let deps = AgentDeps {
        store: Arc::new(SessionStore::new(dir.path().to_path_buf())),
        event_bus: Arc::new(EventBus::new()),
        connectors: Arc::new(ConnectorRegistry::new()),
        inference: Arc::new(InferenceRouter::new(vec![])),
        tools: Arc::new(ToolResolver::new()),
    };
    let system = Arc::new(AgentSystem::new(deps));
    system.load().await;
    system.start().await;
    (AppState { system, auth_token: None }, dir)
}

#[tokio::test]
async fn health_reports_ok_with_agent_count() {
    let (state, _dir) = test_state().await;
    let axum::Json(body) = health(State(state)).await;
    assert_eq!(body.status, "ok");
    assert_eq!(body.agents, 0);
}

#[tokio::test]
async fn ready_reports_ready() {
    let (state, _dir) = test_state().await;
    let (status, axum::Json(body)) = ready(State(state)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert!(body.ready);
}
