//! Response builders understood by the bridge.
//!
//! A bridged caller only sees what these markers tell it:
//! - [`application_error_response`] pairs status 500 with the error marker so
//!   the caller raises the serialized error instead of returning a response.
//! - [`streamed_response`] adds the stream sentinel so the caller receives a
//!   live stream handle instead of a buffered body.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};
use tracing::warn;

use fetch_bridge_common::ErrorPayload;
use fetch_bridge_common::wire::{APPLICATION_ERROR_STATUS, ERROR_BODY_HEADER, STREAM_BODY_HEADER};

/// A fully buffered response with plain string headers.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Convert to an axum response, skipping headers that are not valid HTTP.
    pub fn into_axum_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid response header"),
            }
        }
        response
    }
}

/// Respond with a serialized application error.
///
/// A bridged caller revives `payload` and raises it with its original kind.
pub fn application_error_response(payload: &ErrorPayload) -> Response<Body> {
    BufferedResponse {
        status: APPLICATION_ERROR_STATUS,
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            (ERROR_BODY_HEADER.to_string(), "1".to_string()),
        ],
        body: payload.encode().into_bytes(),
    }
    .into_axum_response()
}

/// Respond with `body`, asking a bridged caller to receive it as a stream.
pub fn streamed_response(body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        HeaderName::from_static(STREAM_BODY_HEADER),
        HeaderValue::from_static("1"),
    );
    response
}
