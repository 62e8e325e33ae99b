use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use verity_core::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`AuthError`] for lifecycle failures and adds transport-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing or malformed `Authorization` header.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Auth(AuthError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(err) => {
                let status = status_for(err);
                let message = match err {
                    AuthError::Internal(detail) => {
                        tracing::error!(error = %detail, "Internal error");
                        "An internal error occurred".to_string()
                    }
                    other => other.to_string(),
                };
                (status, err.code(), message)
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::DuplicateIdentity { .. } => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::NotVerified => StatusCode::FORBIDDEN,
        AuthError::TokenNotFound => StatusCode::NOT_FOUND,
        AuthError::TokenAlreadyUsed => StatusCode::CONFLICT,
        AuthError::TokenExpired => StatusCode::GONE,
        AuthError::InvalidCode => StatusCode::BAD_REQUEST,
        AuthError::AccountNotFound => StatusCode::NOT_FOUND,
        AuthError::SessionInvalid | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
