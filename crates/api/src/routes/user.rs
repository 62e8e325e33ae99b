//! Route definitions for the `/user` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/user`. All require a bearer token.
///
/// ```text
/// GET /profile -> profile
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(user::profile))
}
