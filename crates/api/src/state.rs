use std::sync::Arc;

use crate::service::AuthService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}
