//! API error type and its mapping onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::error::{ObserveError, StoreError, Violation};

pub enum ApiError {
    NotFound(String),

    /// Config rejected; carries every violated rule.
    Validation(Vec<Violation>),

    BadRequest(String),

    Conflict(String),

    /// An upstream collaborator (e.g. fleet inventory) failed.
    BadGateway(String),

    InternalServerError(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            StoreError::Validation(v) => ApiError::Validation(v),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(_) | StoreError::Serialization(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<ObserveError> for ApiError {
    fn from(err: ObserveError) -> Self {
        match err {
            ObserveError::Store(e) => e.into(),
            ObserveError::Fleet(e) => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "config validation failed",
                    "violations": violations,
                }),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::BadGateway(message) => {
                tracing::warn!("Upstream failure: {}", message);
                (StatusCode::BAD_GATEWAY, json!({ "error": message }))
            }
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
