// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token auth middleware.

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorCode;
use crate::transport::state::AppState;

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token. `Ok(())` when `expected` is `None` (auth
/// disabled) or the header matches.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ErrorCode> {
    let Some(expected) = expected else { return Ok(()) };

    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ErrorCode::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ErrorCode::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(ErrorCode::Unauthorized)
    }
}

/// `GET /v1/events` and the health routes skip auth: SSE clients may not be
/// able to set a header, and health checks must work unauthenticated.
fn skips_auth(path: &str) -> bool {
    matches!(path, "/v1/health" | "/v1/ready")
}

pub async fn auth_layer(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if skips_auth(req.uri().path()) {
        return next.run(req).await;
    }
    if let Err(code) = validate_bearer(req.headers(), state.auth_token.as_deref()) {
        return code.to_http_response("unauthorized").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
