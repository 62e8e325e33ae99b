//! Handlers for the `/auth` resource (register, login, verification).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use verity_core::codes;
use verity_core::error::AuthError;
use verity_core::types::{RoleSet, Timestamp};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::service::{Dispatch, Redemption};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
    #[validate(length(min = 6, max = 100, message = "Password must be between 6 and 100 characters"))]
    pub password: String,
}

/// Request body for `POST /auth/login`. `identifier` is a username or email.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for `POST /auth/verify-code`.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

/// Query string for `GET /auth/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyTokenQuery {
    pub token: String,
}

/// Query string for the resend endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct ResendQuery {
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub username: String,
    pub email: String,
    pub verification: Dispatch,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: Timestamp,
    pub username: String,
    pub roles: RoleSet,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub message: &'static str,
    pub verification: Dispatch,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisterResponse>>)> {
    input.validate()?;

    let registration = state
        .auth
        .register(&input.username, &input.email, &input.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RegisterResponse {
                message: registration.message,
                username: registration.account.username,
                email: registration.account.email,
                verification: registration.dispatch,
            },
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    input.validate()?;

    let session = state.auth.login(&input.identifier, &input.password).await?;

    Ok(Json(DataResponse {
        data: LoginResponse {
            token: session.token,
            expires_at: session.expires_at,
            username: session.subject,
            roles: session.roles,
        },
    }))
}

/// GET /api/auth/verify?token=...
pub async fn verify_token(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> AppResult<Json<DataResponse<Redemption>>> {
    let redemption = state.auth.redeem_by_token(&query.token).await?;
    Ok(Json(DataResponse { data: redemption }))
}

/// POST /api/auth/verify-code
pub async fn verify_code(
    State(state): State<AppState>,
    Json(input): Json<VerifyCodeRequest>,
) -> AppResult<Json<DataResponse<Redemption>>> {
    input.validate()?;
    if !codes::is_well_formed_code(&input.code) {
        return Err(AuthError::Validation("Code must be 6 digits".into()).into());
    }

    let redemption = state.auth.redeem_by_code(&input.email, &input.code).await?;
    Ok(Json(DataResponse { data: redemption }))
}

/// POST /api/auth/resend-verification-link?email=...
pub async fn resend_link(
    State(state): State<AppState>,
    Query(query): Query<ResendQuery>,
) -> AppResult<Json<DataResponse<ResendResponse>>> {
    query.validate()?;

    let issued = state.auth.issue_link_token(&query.email).await?;
    Ok(Json(DataResponse {
        data: ResendResponse {
            message: "Verification link sent to your email",
            verification: issued.dispatch,
        },
    }))
}

/// POST /api/auth/resend-verification-code?email=...
pub async fn resend_code(
    State(state): State<AppState>,
    Query(query): Query<ResendQuery>,
) -> AppResult<Json<DataResponse<ResendResponse>>> {
    query.validate()?;

    let issued = state.auth.issue_code_token(&query.email).await?;
    Ok(Json(DataResponse {
        data: ResendResponse {
            message: "Verification code sent to your email",
            verification: issued.dispatch,
        },
    }))
}
