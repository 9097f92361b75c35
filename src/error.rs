use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

/// One failed validation rule, reported in the 422 `details` array.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub message: String,
    pub field: &'static str,
    pub input: Value,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>, input: Value) -> Self {
        Self {
            message: message.into(),
            field,
            input,
        }
    }
}

/// Domain error taxonomy. Constructed at the point of detection and rendered
/// to the wire format at the boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Requested data missing.")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("An unexpected error has occurred.")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-constraint rejection is the authoritative guard for the
        // pre-check-then-insert pattern, so it must map to a friendly 409.
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::AlreadyExists("Resource already exists.".into());
            }
        }
        ApiError::Internal(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: bool,
    message: String,
    status_code: u16,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(ref source) = self {
            error!(error = %source, "internal error");
        }
        let details = match &self {
            ApiError::Validation(details) => Some(details.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: true,
            message: self.to_string(),
            status_code: status.as_u16(),
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
