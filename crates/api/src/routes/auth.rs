//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register                      -> register
/// POST /login                         -> login
/// GET  /verify?token=                 -> verify_token
/// POST /verify-code                   -> verify_code
/// POST /resend-verification-link?email=  -> resend_link
/// POST /resend-verification-code?email=  -> resend_code
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", get(auth::verify_token))
        .route("/verify-code", post(auth::verify_code))
        .route("/resend-verification-link", post(auth::resend_link))
        .route("/resend-verification-code", post(auth::resend_code))
}
