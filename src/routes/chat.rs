//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions API endpoint.
//! Handles both streaming and non-streaming responses.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use tracing::{info, warn};

use crate::{
    aliases,
    chat::{
        from_upstream, from_upstream_event, to_upstream, ChatCompletionRequest, CompletionMeta,
        UpstreamRequest,
    },
    error::AppError,
    retry::with_credential_retry,
    streaming::sse::{format_sse_chunk, format_sse_done},
    AppState,
};

/// Handle chat completion requests
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
    request.validate()?;

    let requested_model = request.model.clone().unwrap_or_default();
    let meta = CompletionMeta::new(requested_model.clone());
    let target = aliases::resolve(&requested_model);

    info!(
        model = %requested_model,
        driver = %target.driver,
        upstream_model = %target.model,
        stream = request.stream.unwrap_or_default(),
        messages = request.messages.len(),
        "Processing chat completion request"
    );

    let upstream_request = to_upstream(request, target);

    if upstream_request.stream {
        handle_streaming_chat(state, upstream_request, meta).await
    } else {
        handle_non_streaming_chat(state, upstream_request, meta, start_time).await
    }
}

async fn handle_non_streaming_chat(
    state: Arc<AppState>,
    request: UpstreamRequest,
    meta: CompletionMeta,
    start_time: Instant,
) -> Result<Response, AppError> {
    let upstream = &state.upstream;
    let request = &request;

    let body = with_credential_retry(&state.session, move |credential| async move {
        upstream.call(request, &credential).await
    })
    .await?;

    let response = from_upstream(&body, &meta);

    info!(
        model = %meta.model,
        finish_reason = ?response.choices[0].finish_reason,
        duration_ms = %format!("{:.2}", start_time.elapsed().as_secs_f64() * 1000.0),
        "Chat completion request completed"
    );

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn handle_streaming_chat(
    state: Arc<AppState>,
    request: UpstreamRequest,
    meta: CompletionMeta,
) -> Result<Response, AppError> {
    let upstream = &state.upstream;
    let request = &request;

    let mut events = with_credential_retry(&state.session, move |credential| async move {
        upstream.call_stream(request, &credential).await
    })
    .await?;

    let model = meta.model.clone();
    let sse_stream = async_stream::stream! {
        let mut forwarded = 0usize;
        while let Some(value) = events.next().await {
            if let Some(event) = from_upstream_event(&value) {
                forwarded += 1;
                yield Ok::<Bytes, Infallible>(format_sse_chunk(&event.into_chunk(&meta)));
            }
        }

        if forwarded == 0 {
            warn!(model = %meta.model, "Upstream stream ended without any content");
        }
        yield Ok(format_sse_done());
        info!(model = %meta.model, chunks = forwarded, "Streaming response complete");
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))?;

    info!(model = %model, "Streaming chat started");
    Ok(response)
}
