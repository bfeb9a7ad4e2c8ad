// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified HTTP error codes: a hand-written `Copy` enum with
//! `http_status()`/`as_str()`, not a `thiserror`-derived type. Maps
//! [`cohort_engine::error::EngineError`] onto HTTP error classes at the
//! transport edge.

use std::fmt;

use serde::{Deserialize, Serialize};

use cohort_engine::error::{EngineError, ErrorClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    BadRequest,
    NotReady,
    Unauthorized,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::NotReady => 503,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::NotReady => "NOT_READY",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of an error response body: `{"code": "...", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorCode {
    pub fn to_error_body(self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    /// Convert this error code into an axum JSON error response.
    pub fn to_http_response(
        self,
        message: impl Into<String>,
    ) -> (axum::http::StatusCode, axum::Json<crate::transport::ErrorResponse>) {
        let status = axum::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = crate::transport::ErrorResponse { error: self.to_error_body(message) };
        (status, axum::Json(body))
    }
}

impl From<&EngineError> for ErrorCode {
    fn from(err: &EngineError) -> Self {
        if matches!(err, EngineError::AgentNotFound(_)) {
            return Self::NotFound;
        }
        match err.class() {
            ErrorClass::Validation => Self::BadRequest,
            ErrorClass::TransientExternal => Self::NotReady,
            ErrorClass::Corruption | ErrorClass::ProgrammingInvariant | ErrorClass::FatalConnector => {
                Self::Internal
            }
        }
    }
}

impl From<EngineError> for ErrorCode {
    fn from(err: EngineError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
