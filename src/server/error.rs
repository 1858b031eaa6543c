//! HTTP error responses.

use crate::model_registry::RegistryError;
use crate::session::SessionError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// User-facing message.
    pub error: String,
    /// Machine-readable code.
    pub code: String,
}

/// A handler failure with its HTTP status.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    /// 400: the request cannot be applied.
    #[display("{_0}")]
    BadRequest(#[error(not(source))] String),
    /// 404: unknown agent or model.
    #[display("{_0}")]
    NotFound(#[error(not(source))] String),
    /// 409: right request, wrong time.
    #[display("{_0}")]
    Conflict(#[error(not(source))] String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        if error.is_conflict() {
            ApiError::Conflict(error.to_string())
        } else {
            ApiError::BadRequest(error.to_string())
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::UnknownModel { .. } => ApiError::NotFound(error.to_string()),
            RegistryError::MissingCredential { .. } => ApiError::BadRequest(error.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        warn!(status = status.as_u16(), error = %self, "Request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}
