// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::HeaderMap;

use crate::error::ErrorCode;
use crate::transport::auth::validate_bearer;

#[yare::parameterized(
    no_token_allows_all = { None, None, true },
    valid_bearer        = { Some("secret123"), Some("Bearer secret123"), true },
    invalid_bearer      = { Some("secret123"), Some("Bearer wrong"), false },
    missing_header      = { Some("secret123"), None, false },
    wrong_scheme        = { Some("secret123"), Some("Basic dXNlcjpwYXNz"), false },
)]
fn bearer_validation(expected_token: Option<&str>, header_value: Option<&str>, should_pass: bool) {
    let mut headers = HeaderMap::new();
    if let Some(val) = header_value {
        headers.insert("authorization", val.parse().unwrap());
    }
    let result = validate_bearer(&headers, expected_token);
    if should_pass {
        assert!(result.is_ok(), "expected Ok, got {result:?}");
    } else {
        assert_eq!(result.err(), Some(ErrorCode::Unauthorized));
    }
}
