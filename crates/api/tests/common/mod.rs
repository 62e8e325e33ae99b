#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use verity_api::auth::password::Argon2Hasher;
use verity_api::router::build_app_router;
use verity_api::service::{AuthService, AuthServiceConfig};
use verity_api::state::AppState;
use verity_core::clock::ManualClock;
use verity_core::config::{SessionConfig, VerificationConfig};
use verity_db::memory::MemoryStore;
use verity_db::store::Stores;
use verity_notify::RecordingNotifier;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// A service wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub auth: Arc<AuthService>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(store.clone(), Stores::shared(store))
    }

    /// Wire the service to `stores`; `store` stays available for inspection.
    pub fn with_stores(store: Arc<MemoryStore>, stores: Stores) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::starting_now());
        let auth = Arc::new(AuthService::new(
            stores,
            notifier.clone(),
            Arc::new(Argon2Hasher),
            clock.clone(),
            AuthServiceConfig {
                verification: VerificationConfig::default(),
                session: SessionConfig::with_secret(TEST_SECRET),
            },
        ));
        Self {
            store,
            notifier,
            clock,
            auth,
        }
    }

    /// The full router over this harness, same middleware as production.
    pub fn app(&self) -> Router {
        build_app_router(
            AppState::new(Arc::clone(&self.auth)),
            Duration::from_secs(30),
        )
    }

    /// Register and verify through the link the user would have received.
    pub async fn verified_account(&self, username: &str, email: &str, password: &str) {
        self.auth
            .register(username, email, password)
            .await
            .expect("registration should succeed");
        let token = self
            .notifier
            .last_link_for(email)
            .expect("registration should send a link");
        self.auth
            .redeem_by_token(&token)
            .await
            .expect("link redemption should succeed");
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(
        app,
        Request::get(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post(app: Router, uri: &str) -> Response {
    send(app, Request::post(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(
        app,
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("router is infallible")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
