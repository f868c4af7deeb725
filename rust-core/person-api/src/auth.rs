// SPDX-License-Identifier: PMPL-1.0-or-later
//! HTTP Basic authentication.
//!
//! Every request must carry `Authorization: Basic <base64(user:password)>`
//! matching the single configured credential pair. Rejections get a bare
//! `401` with a `WWW-Authenticate` challenge and no body.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Challenge sent with every 401.
pub const CHALLENGE: &str = r#"Basic realm="person""#;

/// Credentials accepted by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl BasicAuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check a `user:password` pair in constant time.
    ///
    /// Both halves are always compared so a wrong user name takes as long to
    /// reject as a wrong password.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        (user_ok & pass_ok).into()
    }
}

/// Axum middleware rejecting requests without valid Basic credentials.
pub async fn basic_auth_middleware(
    State(auth): State<BasicAuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    match credentials(request.headers()) {
        Some((user, password)) if auth.verify(&user, &password) => next.run(request).await,
        Some((user, _)) => {
            warn!(user = %user, path = %request.uri().path(), "rejected credentials");
            unauthorized()
        }
        None => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
    )
        .into_response()
}

/// Decode the Basic credentials from the `Authorization` header, if any.
fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}
