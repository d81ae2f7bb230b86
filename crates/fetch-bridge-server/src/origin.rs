//! Detection of requests issued through the bridge.
//!
//! Every bridged request carries [`BRIDGE_ORIGIN_HEADER`]. Serving code reads
//! the [`BridgeOrigin`] extension recorded by [`mark_bridge_origin`] to avoid
//! handling such a call synchronously a second time.

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use fetch_bridge_common::wire::BRIDGE_ORIGIN_HEADER;

/// Whether the current request was issued through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeOrigin(pub bool);

impl BridgeOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(headers.contains_key(BRIDGE_ORIGIN_HEADER))
    }

    pub fn is_bridged(self) -> bool {
        self.0
    }
}

/// Middleware recording a [`BridgeOrigin`] extension on every request.
pub async fn mark_bridge_origin(mut request: Request, next: Next) -> Response {
    let origin = BridgeOrigin::from_headers(request.headers());
    if origin.is_bridged() {
        debug!(path = %request.uri().path(), "Request issued through the bridge");
    }
    request.extensions_mut().insert(origin);
    next.run(request).await
}
