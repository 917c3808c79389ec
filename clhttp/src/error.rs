//! The HTTP Surface's single error type, following `pmoplaylist::api::map_error`'s
//! shape: one enum covering every failure this
//! crate's handlers can produce, converted to a `(StatusCode, Json)` response
//! by `IntoResponse` rather than a separate `map_error` free function.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use clmetadata::{FetchError, UpstreamErrorCode};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("dashboard credentials required")]
    Unauthorized,
    #[error("this operation requires persistence, which is not configured")]
    Unavailable,
    #[error("upstream fetcher error: {1}")]
    Upstream(UpstreamErrorCode, String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<clstore::Error> for AppError {
    fn from(err: clstore::Error) -> Self {
        match err {
            clstore::Error::Unavailable => AppError::Unavailable,
            clstore::Error::NotFound => AppError::NotFound("not found".to_string()),
            other => AppError::Other(other.into()),
        }
    }
}

impl From<cllobby::Error> for AppError {
    fn from(err: cllobby::Error) -> Self {
        match err {
            cllobby::Error::NotFound => AppError::NotFound("lobby not found".to_string()),
            cllobby::Error::NameTaken(name) => {
                AppError::Validation(format!("a lobby named '{name}' already exists"))
            }
            cllobby::Error::InvalidName => {
                AppError::Validation("lobby name must be 1-50 characters".to_string())
            }
            cllobby::Error::Store(e) => e.into(),
        }
    }
}

impl From<clsongcache::Error> for AppError {
    fn from(err: clsongcache::Error) -> Self {
        match err {
            clsongcache::Error::StoreUnavailable => AppError::Unavailable,
            clsongcache::Error::Store(e) => e.into(),
            clsongcache::Error::Io(e) => AppError::Other(e.into()),
        }
    }
}

impl From<clcovers::Error> for AppError {
    fn from(err: clcovers::Error) -> Self {
        match err {
            clcovers::Error::NotFound(id) => AppError::NotFound(format!("no cover for {id}")),
            other => AppError::Other(other.into()),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match &err {
            FetchError::Upstream(code, message) => AppError::Upstream(*code, message.clone()),
            _ => AppError::Other(anyhow::anyhow!(err)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", None),
            AppError::Upstream(code, _) => (
                StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "UPSTREAM_FAILURE",
                Some(code.as_str()),
            ),
            AppError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            code,
        });

        if matches!(self, AppError::Unauthorized) {
            return (status, [(header::WWW_AUTHENTICATE, "Basic realm=\"dashboard\"")], body)
                .into_response();
        }

        (status, body).into_response()
    }
}
