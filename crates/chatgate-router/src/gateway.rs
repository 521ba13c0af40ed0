use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatgate_core::{
    ApiError, AuthGate, Backend, ChunkStream, Credential, ModelCatalog, RateLimiter,
};
use chatgate_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use chatgate_protocol::sse;

#[derive(Clone)]
pub struct GatewayState {
    pub auth: Arc<AuthGate>,
    pub limiter: Arc<RateLimiter>,
    pub backend: Arc<dyn Backend>,
    pub catalog: Arc<ModelCatalog>,
}

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(models_list))
        .route("/v1/models/{model}", get(models_get))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn chat_completions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();

    let _credential = match gate_and_admit(&state, &headers) {
        Ok(credential) => credential,
        Err(err) => return error_response(err, &trace_id),
    };

    let request = match decode_chat_request(&body) {
        Ok(request) => request,
        Err(err) => return error_response(err, &trace_id),
    };

    let is_stream = request.is_stream();
    info!(
        event = "chat_received",
        trace_id = %trace_id,
        backend = state.backend.name(),
        model = %request.model,
        messages = request.messages.len(),
        is_stream
    );

    if is_stream {
        let chunks = match state.backend.complete_stream(&request).await {
            Ok(chunks) => chunks,
            // Failures before the first chunk still map to a plain HTTP error.
            Err(err) => return error_response(ApiError::from(err), &trace_id),
        };
        info!(
            event = "chat_responded",
            trace_id = %trace_id,
            status = 200,
            elapsed_ms = started_at.elapsed().as_millis(),
            is_stream
        );
        return stream_response(chunks, trace_id);
    }

    match state.backend.complete(&request).await {
        Ok(completion) => {
            info!(
                event = "chat_responded",
                trace_id = %trace_id,
                status = 200,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream
            );
            let mut response = (StatusCode::OK, Json(completion)).into_response();
            attach_request_id(&mut response, &trace_id);
            response
        }
        Err(err) => error_response(ApiError::from(err), &trace_id),
    }
}

async fn models_list(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    if let Err(err) = gate_and_admit(&state, &headers) {
        return error_response(err, &trace_id);
    }
    debug!(trace_id = %trace_id, "listing models");
    let mut response = (StatusCode::OK, Json(state.catalog.list())).into_response();
    attach_request_id(&mut response, &trace_id);
    response
}

async fn models_get(
    State(state): State<GatewayState>,
    Path(model): Path<String>,
    headers: HeaderMap,
) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    if let Err(err) = gate_and_admit(&state, &headers) {
        return error_response(err, &trace_id);
    }
    debug!(trace_id = %trace_id, model = %model, "getting model");
    match state.catalog.get(&model) {
        Ok(model) => {
            let mut response = (StatusCode::OK, Json(model)).into_response();
            attach_request_id(&mut response, &trace_id);
            response
        }
        Err(err) => error_response(err, &trace_id),
    }
}

/// Header-only admission pipeline, run before any body parsing: credential
/// lookup, then the per-credential window check keyed by the match.
fn gate_and_admit(state: &GatewayState, headers: &HeaderMap) -> Result<Credential, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let credential = state.auth.authenticate(header)?;
    state.limiter.admit(&credential)?;
    Ok(credential)
}

fn decode_chat_request(body: &Bytes) -> Result<CreateChatCompletionRequestBody, ApiError> {
    let request: CreateChatCompletionRequestBody = serde_json::from_slice(body).map_err(|err| {
        let message = err.to_string();
        let param = backticked_field(&message);
        ApiError::validation(format!("Invalid request body: {message}"), param)
    })?;

    if request.messages.is_empty() {
        return Err(ApiError::validation(
            "`messages` must contain at least 1 message.",
            Some("messages".to_string()),
        ));
    }

    Ok(request)
}

/// Best-effort `param` extraction from serde's "missing field `model`"-style
/// messages.
fn backticked_field(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let end = message[start..].find('`')? + start;
    Some(message[start..end].to_string())
}

/// Bridge a backend chunk sequence onto the wire: one SSE record per chunk,
/// in production order, then exactly one `[DONE]` record. A mid-stream
/// backend failure cannot change the already-committed status, so it
/// degrades to logged truncation; the sentinel is still emitted. A client
/// disconnect closes the channel, the forwarder returns, and dropping the
/// chunk receiver stops the producer.
fn stream_response(mut chunks: ChunkStream, trace_id: String) -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(32);

    let task_trace_id = trace_id.clone();
    tokio::spawn(async move {
        while let Some(item) = chunks.recv().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(
                        event = "stream_aborted",
                        trace_id = %task_trace_id,
                        error = %err,
                        "backend failed mid-stream, terminating early"
                    );
                    break;
                }
            };
            let payload = match serde_json::to_string(&chunk) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(
                        event = "stream_aborted",
                        trace_id = %task_trace_id,
                        error = %err,
                        "chunk encoding failed, terminating early"
                    );
                    break;
                }
            };
            if tx.send(Bytes::from(sse::data_frame(&payload))).await.is_err() {
                return;
            }
        }
        let _ = tx.send(Bytes::from_static(sse::DONE_FRAME.as_bytes())).await;
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    // Hint common reverse proxies to avoid buffering SSE responses.
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    attach_request_id(&mut response, &trace_id);
    response
}

fn error_response(err: ApiError, trace_id: &str) -> Response {
    let status = err.status();
    if status.is_server_error() {
        warn!(trace_id = %trace_id, status = status.as_u16(), error = %err, "request failed");
    } else {
        info!(trace_id = %trace_id, status = status.as_u16(), error = %err, "request rejected");
    }

    let mut response = (status, Json(err.envelope())).into_response();
    if let Some(seconds) = err.retry_after()
        && let Ok(value) = HeaderValue::from_str(&seconds.to_string())
    {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    attach_request_id(&mut response, trace_id);
    response
}

fn attach_request_id(response: &mut Response, trace_id: &str) {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        response.headers_mut().insert("x-request-id", value);
    }
}
