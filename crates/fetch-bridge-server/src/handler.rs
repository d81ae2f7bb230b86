//! Handlers of the development server.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::Extension;
use axum::body::{Body, Bytes};
use axum::extract::Path;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::stream;
use tracing::{info, instrument};

use fetch_bridge_common::ErrorPayload;

use crate::origin::BridgeOrigin;
use crate::response::{BufferedResponse, application_error_response, streamed_response};

/// Chunks served by [`stream_chunks`].
pub const STREAM_CHUNKS: [&str; 3] = ["chunk-1;", "chunk-2;", "chunk-3"];

const STREAM_CHUNK_DELAY: Duration = Duration::from_millis(20);

/// Health check handler.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Describe the received request as JSON.
#[instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub async fn echo(
    origin: Option<Extension<BridgeOrigin>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bridged = origin.is_some_and(|Extension(origin)| origin.is_bridged());
    info!(bridged, body_len = body.len(), "Echoing request");

    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();

    BufferedResponse::json(
        200,
        &serde_json::json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
            "bridged": bridged,
        }),
    )
    .into_axum_response()
}

/// Stream [`STREAM_CHUNKS`] with a short pause before each chunk.
pub async fn stream_chunks() -> Response {
    let chunks = stream::unfold(0usize, |index| async move {
        let chunk: &'static str = *STREAM_CHUNKS.get(index)?;
        tokio::time::sleep(STREAM_CHUNK_DELAY).await;
        Some((Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes())), index + 1))
    });
    streamed_response(Body::from_stream(chunks))
}

/// Fail with a `RangeError` application error.
pub async fn fail() -> Response {
    application_error_response(&ErrorPayload::new("RangeError", "boom"))
}

/// Fail with an application error of the given name.
pub async fn fail_named(Path(name): Path<String>) -> Response {
    application_error_response(&ErrorPayload::new(name, "boom"))
}

/// Respond with the given status and no body.
pub async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => status.into_response(),
        Err(_) => BufferedResponse::text(400, &format!("Invalid status code: {code}"))
            .into_axum_response(),
    }
}
