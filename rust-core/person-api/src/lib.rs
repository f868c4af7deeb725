// SPDX-License-Identifier: PMPL-1.0-or-later
//! Person API
//!
//! HTTP API server for the person directory.
//! Exposes create, read, update and delete on `/person` over whichever
//! storage backend was configured at startup.
//!
//! Request flow: Basic auth gate, access log, method dispatch, handler,
//! storage. Handler errors become JSON `{"error": "..."}` bodies.

use std::sync::Arc;

use axum::{middleware, routing::any, Router};
use person_storage::{PersonStorage, StorageConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

pub mod access_log;
pub mod auth;
pub mod combine;
pub mod error;
pub mod handlers;

pub use access_log::AccessLog;
pub use auth::BasicAuthConfig;
pub use combine::{combine_filters, intersect_by_id};
pub use error::{ApiError, ErrorResponse};

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log request and response bodies in the access log
    pub log_body: bool,
    /// Accepted Basic credentials
    pub auth: BasicAuthConfig,
    /// Storage backend selection
    pub storage: StorageConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5002,
            log_body: false,
            auth: BasicAuthConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn PersonStorage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn PersonStorage>) -> Self {
        Self { storage }
    }
}

/// Build the API router
pub fn build_router(state: AppState, config: &ApiConfig) -> Router {
    let access_log = AccessLog {
        log_body: config.log_body,
    };

    Router::new()
        .route("/person", any(handlers::dispatch))
        .route("/person/", any(handlers::dispatch))
        .route("/person/{*rest}", any(handlers::dispatch))
        .with_state(state)
        // Layers run outermost-last: auth rejects before anything is logged.
        .layer(middleware::from_fn_with_state(
            access_log,
            access_log::access_log_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            config.auth.clone(),
            auth::basic_auth_middleware,
        ))
}

/// Start the API server and run until Ctrl-C or SIGTERM.
pub async fn serve(config: ApiConfig, storage: Arc<dyn PersonStorage>) -> Result<(), std::io::Error> {
    let app = build_router(AppState::new(storage), &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Person API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Person API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use person_storage::InMemoryStorage;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(Arc::new(InMemoryStorage::new()));
        build_router(state, &ApiConfig::default())
    }

    fn authorized(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("admin:admin")),
            )
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5002);
        assert!(!config.log_body);
        assert_eq!(config.auth.username, "admin");
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let response = app().oneshot(authorized("/person")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = app().oneshot(authorized("/people")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        let response = app()
            .oneshot(Request::builder().uri("/person").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            auth::CHALLENGE
        );
    }
}
