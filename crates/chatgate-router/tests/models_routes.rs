//! Route tests for the model catalog endpoints and the liveness probe.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::{TOKEN, body_json, get_request, mock_router};

#[tokio::test]
async fn lists_models_as_an_openai_list() {
    let response = mock_router()
        .oneshot(get_request("/v1/models", Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["object"], "list");
    let data = value["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert!(data.iter().all(|model| model["object"] == "model"));
}

#[tokio::test]
async fn gets_a_model_by_id() {
    let response = mock_router()
        .oneshot(get_request("/v1/models/chatgate-standard", Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["id"], "chatgate-standard");
    assert_eq!(value["object"], "model");
    assert_eq!(value["owned_by"], "chatgate");
}

#[tokio::test]
async fn unknown_model_is_404() {
    let response = mock_router()
        .oneshot(get_request("/v1/models/not-a-real-model", Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let value = body_json(response).await;
    assert_eq!(value["error"]["type"], "invalid_request_error");
    assert_eq!(value["error"]["code"], "model_not_found");
    assert_eq!(value["error"]["param"], "model_id");
}

#[tokio::test]
async fn model_routes_require_authentication() {
    for uri in ["/v1/models", "/v1/models/chatgate-standard"] {
        let response = mock_router()
            .oneshot(get_request(uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let value = body_json(response).await;
        assert_eq!(value["error"]["type"], "authentication_error");
    }
}

#[tokio::test]
async fn health_is_unauthenticated() {
    let response = mock_router()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value, serde_json::json!({"status": "ok"}));
}
