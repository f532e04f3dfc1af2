//! Common utilities for integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use server::config::ServerConfig;
use server::{build_router, AppState};
use tower::ServiceExt;
use wiremock::MockServer;

pub const SPEECH_KEY: &str = "test-elevenlabs-key";
pub const MODEL_KEY: &str = "test-openai-key";

/// Config with both providers pointed at `provider` and both keys set.
pub fn config_for(provider: &MockServer) -> ServerConfig {
    ServerConfig {
        elevenlabs_api_key: Some(SPEECH_KEY.to_string()),
        elevenlabs_base_url: provider.uri(),
        openai_api_key: Some(MODEL_KEY.to_string()),
        llm_base_url: format!("{}/v1", provider.uri()),
        llm_timeout_secs: 5,
        ..ServerConfig::default()
    }
}

/// Create a test app instance
pub fn create_test_app(config: ServerConfig) -> Router {
    build_router(AppState::from_config(config))
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}
