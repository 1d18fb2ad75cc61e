use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::catalog::CatalogError;
use crate::identity::AuthError;
use crate::validation::ValidationError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::BadRequest(value.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::Validation(err) => err.into(),
            CatalogError::NotOwner { .. } => {
                ApiError::Forbidden("Only the teacher who owns this class can change it".into())
            }
            CatalogError::NotFound(_) => ApiError::NotFound(value.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials | AuthError::NotSignedIn => {
                ApiError::Unauthorized(value.to_string())
            }
            AuthError::EmailNotVerified => ApiError::Forbidden(value.to_string()),
            AuthError::EmailAlreadyInUse => ApiError::Conflict(value.to_string()),
            AuthError::WeakPassword { .. }
            | AuthError::InvalidEmail(_)
            | AuthError::InvalidVerificationCode => ApiError::BadRequest(value.to_string()),
            AuthError::Unavailable => {
                error!("identity provider unavailable");
                ApiError::Internal("Identity service unavailable".into())
            }
        }
    }
}
