pub mod auth;
pub mod health;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Every resource router, to be nested under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/user", user::router())
        .merge(health::router())
}
