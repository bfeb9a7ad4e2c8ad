// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cohort_engine::error::EngineError;

use super::ErrorCode;

#[test]
fn agent_not_found_maps_to_not_found() {
    let code: ErrorCode = EngineError::AgentNotFound("abc".into()).into();
    assert_eq!(code, ErrorCode::NotFound);
    assert_eq!(code.http_status(), 404);
}

#[test]
fn no_provider_maps_to_not_ready() {
    let code: ErrorCode = EngineError::NoProvider.into();
    assert_eq!(code, ErrorCode::NotReady);
    assert_eq!(code.http_status(), 503);
}

#[test]
fn invariant_violation_maps_to_internal() {
    let code: ErrorCode = EngineError::Invariant("bug".into()).into();
    assert_eq!(code, ErrorCode::Internal);
    assert_eq!(code.http_status(), 500);
}

#[test]
fn unknown_tool_maps_to_bad_request() {
    let code: ErrorCode = EngineError::UnknownTool("frobnicate".into()).into();
    assert_eq!(code, ErrorCode::BadRequest);
    assert_eq!(code.http_status(), 400);
}
