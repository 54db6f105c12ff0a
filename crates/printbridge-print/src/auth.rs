// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bearer-token gate in front of every route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use printbridge_core::error::{GatewayError, Result};
use tracing::warn;

use crate::http_server::ApiError;

const BEARER: &str = "bearer ";

/// Holds the shared credential and checks `Authorization` headers against it.
#[derive(Clone)]
pub struct AuthGate {
    token: Arc<str>,
}

impl AuthGate {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self { token: token.into() }
    }

    /// Accept only `Bearer <token>` with exactly the configured token.
    pub fn check(&self, header: Option<&HeaderValue>) -> Result<()> {
        let presented = header
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .and_then(strip_bearer);

        match presented {
            Some(token) if constant_time_eq(token.as_bytes(), self.token.as_bytes()) => Ok(()),
            _ => Err(GatewayError::Unauthorized("Unauthorized".into())),
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").field("token", &"<redacted>").finish()
    }
}

/// Middleware rejecting requests without the configured bearer token.
///
/// Runs before routing and body extraction, so a rejected request never
/// stages a file or reaches a platform tool.
pub async fn require_bearer(
    State(gate): State<AuthGate>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    if let Err(e) = gate.check(req.headers().get(AUTHORIZATION)) {
        warn!(method = %req.method(), path = %req.uri().path(), "rejected request without valid credential");
        return Err(e.into());
    }
    Ok(next.run(req).await)
}

fn strip_bearer(value: &str) -> Option<&str> {
    let prefix = value.get(..BEARER.len())?;
    prefix
        .eq_ignore_ascii_case(BEARER)
        .then(|| &value[BEARER.len()..])
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).expect("header value")
    }

    #[test]
    fn accepts_exact_bearer_token() {
        let gate = AuthGate::new("s3cret");
        assert!(gate.check(Some(&header("Bearer s3cret"))).is_ok());
        assert!(gate.check(Some(&header("bearer s3cret"))).is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong_credentials() {
        let gate = AuthGate::new("s3cret");
        for value in ["", "Bearer", "Bearer ", "Bearer s3cre", "Bearer s3cret2", "s3cret", "Basic s3cret"] {
            let err = gate.check(Some(&header(value))).unwrap_err();
            assert!(matches!(err, GatewayError::Unauthorized(_)), "{value:?}");
        }
        assert!(gate.check(None).is_err());
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", AuthGate::new("s3cret"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn constant_time_eq_matches_plain_equality() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
