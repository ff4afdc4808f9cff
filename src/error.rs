use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::users::query::QueryError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, detected before touching any store.
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The session referenced a user that is gone or blocked.
    #[error("Session invalid")]
    SessionInvalid,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account blocked")]
    AccountBlocked,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Logout failed")]
    LogoutFailed,
    /// Store or unexpected failure. `details` is only set outside production.
    #[error("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display, expose: bool) -> Self {
        ApiError::Internal {
            message: message.into(),
            details: expose.then(|| cause.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::SessionInvalid | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AccountBlocked => StatusCode::FORBIDDEN,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::LogoutFailed | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let ApiError::Internal {
            details: Some(details),
            ..
        } = &self
        {
            body["details"] = json!(details);
        }
        (status, Json(body)).into_response()
    }
}
