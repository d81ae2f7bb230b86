//! HTTP router configuration.

use axum::Router;
use axum::middleware;
use axum::routing::{any, get};
use tower_http::trace::TraceLayer;

use crate::handler::{echo, fail, fail_named, health_check, status, stream_chunks};
use crate::origin::mark_bridge_origin;

/// Build the development server router.
///
/// Routes:
/// - `GET /health` - Health check
/// - `ANY /echo` - Describe the received request as JSON
/// - `GET /stream` - Streamed body carrying the stream sentinel
/// - `ANY /fail` - `RangeError` application error
/// - `ANY /fail/:name` - Application error of the given name
/// - `ANY /status/:code` - Empty response with the given status
pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/echo", any(echo))
        .route("/stream", get(stream_chunks))
        .route("/fail", any(fail))
        .route("/fail/:name", any(fail_named))
        .route("/status/:code", any(status))
        .layer(middleware::from_fn(mark_bridge_origin))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fetch_bridge_common::wire::{BRIDGE_ORIGIN_HEADER, ERROR_BODY_HEADER, STREAM_BODY_HEADER};
    use tower::util::ServiceExt;

    use super::*;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = build_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_echo_reports_bridge_origin() {
        let response = build_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo?x=1")
                    .header(BRIDGE_ORIGIN_HEADER, "1")
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["method"], "POST");
        assert_eq!(body["path"], "/echo");
        assert_eq!(body["query"], "x=1");
        assert_eq!(body["body"], "payload");
        assert_eq!(body["bridged"], true);
    }

    #[tokio::test]
    async fn test_echo_without_marker() {
        let response = build_router()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(json_body(response).await["bridged"], false);
    }

    #[tokio::test]
    async fn test_stream_route_sets_sentinel() {
        let response = build_router()
            .oneshot(Request::builder().uri("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(STREAM_BODY_HEADER));
    }

    #[tokio::test]
    async fn test_fail_route_sets_error_marker() {
        let response = build_router()
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(ERROR_BODY_HEADER));
        assert_eq!(json_body(response).await["name"], "RangeError");
    }

    #[tokio::test]
    async fn test_status_route() {
        let response = build_router()
            .oneshot(Request::builder().uri("/status/204").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = build_router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
