// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-request access log.
//!
//! Emits two INFO events on the `person_api::access` target, one when a
//! request arrives and one when its response leaves. With body logging on,
//! JSON request bodies and all response bodies are buffered and logged too.

use std::time::Instant;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::handlers::is_json;

/// Largest body the access log will buffer.
const MAX_LOGGED_BODY: usize = 4 * 1024 * 1024;

/// Access log settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog {
    pub log_body: bool,
}

/// Axum middleware writing the access log.
pub async fn access_log_middleware(
    State(log): State<AccessLog>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let request = if log.log_body && is_json(request.headers()) && fits(request.body()) {
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(target: "person_api::access", %method, %path, error = %err, "unreadable request body");
                return StatusCode::BAD_REQUEST.into_response();
            }
        };
        info!(
            target: "person_api::access",
            %method,
            %path,
            agent = %agent,
            body = %String::from_utf8_lossy(&bytes),
            "request"
        );
        Request::from_parts(parts, Body::from(bytes))
    } else {
        info!(target: "person_api::access", %method, %path, agent = %agent, "request");
        request
    };

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    if !log.log_body || !fits(response.body()) {
        info!(target: "person_api::access", %method, %path, status, latency_ms, "response");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(target: "person_api::access", %method, %path, error = %err, "unreadable response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    info!(
        target: "person_api::access",
        %method,
        %path,
        status,
        latency_ms,
        body = %String::from_utf8_lossy(&bytes),
        "response"
    );
    Response::from_parts(parts, Body::from(bytes))
}

/// True when the body has a known length within [`MAX_LOGGED_BODY`].
///
/// Streaming or oversized bodies pass through unlogged and untouched.
fn fits(body: &Body) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_LOGGED_BODY as u64)
}
