// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: REST introspection plus an SSE event bridge.

pub mod agents;
pub mod auth;
pub mod health;
pub mod sse;
pub mod state;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

pub use state::AppState;

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: crate::error::ErrorBody,
}

/// Build the full axum `Router`: REST introspection, the SSE bridge, and
/// health/ready, behind the bearer-auth middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", get(sse::events))
        .route("/v1/agents", get(agents::list))
        .route("/v1/agents/{id}/history", get(agents::history))
        .route("/v1/agents/{id}/reset", post(agents::reset))
        .route("/v1/health", get(health::health))
        .route("/v1/ready", get(health::ready))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Minimal health-only router, for an optional separate `--health-port`.
pub fn build_health_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health::health))
        .route("/v1/ready", get(health::ready))
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
