//! Handlers for the `/user` resource.

use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::service::Profile;
use crate::state::AppState;

/// GET /api/user/profile
///
/// Profile of the account named by the bearer token.
pub async fn profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = state.auth.profile(&user.username).await?;
    Ok(Json(DataResponse { data: profile }))
}
