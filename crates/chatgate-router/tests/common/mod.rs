#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;

use chatgate_core::{AuthGate, Backend, MockBackend, ModelCatalog, RateLimiter};
use chatgate_router::{GatewayState, gateway_router};

pub const TOKEN: &str = "test-token-0123456789";
pub const MOCK_REPLY: &str = "alpha beta gamma";

pub fn router_with(backend: Arc<dyn Backend>, ceiling: u32) -> Router {
    gateway_router(GatewayState {
        auth: Arc::new(AuthGate::new([TOKEN])),
        limiter: Arc::new(RateLimiter::new(ceiling)),
        backend,
        catalog: Arc::new(ModelCatalog::new()),
    })
}

pub fn mock_router() -> Router {
    router_with(
        Arc::new(MockBackend::with_reply(MOCK_REPLY, Duration::ZERO)),
        100,
    )
}

pub fn chat_request(payload: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
