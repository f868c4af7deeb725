// SPDX-License-Identifier: PMPL-1.0-or-later
//! API error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use person_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Errors a request handler can end with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("wrong content type: expected application/json")]
    WrongContentType,

    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Any storage failure other than a conflict or a miss.
    #[error("internal error: {0}")]
    Backend(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AlreadyExists(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WrongContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InvalidBody(_) | ApiError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(_) => ApiError::AlreadyExists(err.to_string()),
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::Backend(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Backend(msg) = &self {
            error!(error = %msg, "storage failure");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
