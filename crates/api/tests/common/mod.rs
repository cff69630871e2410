//! Shared helpers for API integration tests.
//!
//! The app runs against the in-memory store and queue so these tests do
//! not need a database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use muster_api::auth::jwt::{generate_access_token, JwtConfig};
use muster_api::config::ServerConfig;
use muster_api::router::build_app_router;
use muster_api::state::AppState;
use muster_core::clone::QueueService;
use muster_core::memory::{MemoryJobQueue, MemoryStore};
use muster_core::types::DbId;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// A router plus handles on the backing store and queue for setup and
/// assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryJobQueue>,
}

/// Build the full application router with all middleware layers.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryJobQueue::new());

    let state = AppState {
        config: Arc::new(config.clone()),
        catalog: store.clone(),
        queue_service: Arc::new(QueueService::new(store.clone(), queue.clone())),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        queue,
    }
}

/// A valid Bearer token for `user_id`.
pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, "admin", &test_config().jwt).unwrap()
}

/// Send a GET request without credentials.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Body::empty()).await
}

/// Send an authenticated GET request.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), Body::empty()).await
}

/// Send an authenticated POST request with a JSON body.
pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(
        app,
        Method::POST,
        uri,
        Some(token),
        Body::from(serde_json::to_vec(&body).unwrap()),
    )
    .await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Body,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
