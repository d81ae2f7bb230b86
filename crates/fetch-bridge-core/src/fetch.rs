//! Request options and response type of a synchronous fetch.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use fetch_bridge_common::{BridgeError, ResponseBody, StreamHandle};

/// Options for [`SyncFetchBridge::fetch`](crate::SyncFetchBridge::fetch).
///
/// The body is a fully materialized buffer. There is intentionally no way to
/// pass a stream: the caller is blocked for the whole fetch and could never
/// feed one.
#[derive(Debug, Clone, Default)]
pub struct FetchInit {
    pub(crate) method: Method,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Bytes>,
}

impl FetchInit {
    /// A `GET` with no headers and no body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several request headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Reject headers that could never be sent.
    pub(crate) fn validate(&self) -> Result<(), BridgeError> {
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| BridgeError::invalid_request(format!("invalid header name '{name}'")))?;
            HeaderValue::from_str(value).map_err(|_| {
                BridgeError::invalid_request(format!("invalid value for header '{name}'"))
            })?;
        }
        Ok(())
    }
}

/// A fully formed response returned by the bridge.
#[derive(Debug)]
pub struct BridgeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (case-insensitive)
    pub headers: HeaderMap,
    /// Response body: buffered bytes, a live stream handle, or null
    pub body: ResponseBody,
}

impl BridgeResponse {
    /// Returns `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Consume the response and return the whole body.
    ///
    /// A streamed body is drained; a null body yields an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if a streamed body fails or is cut
    /// off before its end.
    ///
    /// # Panics
    ///
    /// Draining a streamed body blocks, so this panics if called from within
    /// an asynchronous execution context.
    pub fn bytes(self) -> Result<Bytes, BridgeError> {
        match self.body {
            ResponseBody::Null => Ok(Bytes::new()),
            ResponseBody::Bytes(bytes) => Ok(bytes),
            ResponseBody::Stream(handle) => handle.read_all(),
        }
    }

    /// Consume the response and decode the body as UTF-8 (lossy).
    ///
    /// # Errors
    ///
    /// Fails as [`bytes`](Self::bytes) does.
    ///
    /// # Panics
    ///
    /// Panics if the body is streamed and this is called from within an
    /// asynchronous execution context.
    pub fn text(self) -> Result<String, BridgeError> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Take the stream handle, if the body was streamed.
    pub fn into_stream(self) -> Option<StreamHandle> {
        self.body.into_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_init_defaults() {
        let init = FetchInit::new();
        assert_eq!(init.method, Method::GET);
        assert!(init.headers.is_empty());
        assert!(init.body.is_none());
    }

    #[test]
    fn test_fetch_init_builder() {
        let init = FetchInit::new()
            .method(Method::POST)
            .header("content-type", "application/json")
            .headers([("x-a", "1"), ("x-b", "2")])
            .body(r#"{"k":1}"#);

        assert_eq!(init.method, Method::POST);
        assert_eq!(init.headers.len(), 3);
        assert_eq!(init.body.as_deref(), Some(&br#"{"k":1}"#[..]));
    }

    #[test]
    fn test_validate_rejects_bad_headers() {
        assert!(FetchInit::new().header("x-ok", "1").validate().is_ok());
        assert!(matches!(
            FetchInit::new().header("bad header", "1").validate(),
            Err(BridgeError::InvalidRequest { .. })
        ));
        assert!(matches!(
            FetchInit::new().header("x-bad", "line\nbreak").validate(),
            Err(BridgeError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        let response = BridgeResponse {
            status: 200,
            headers,
            body: ResponseBody::Bytes(Bytes::from_static(b"hello")),
        };

        assert!(response.ok());
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.text().unwrap(), "hello");
    }

    #[test]
    fn test_null_body_bytes_is_empty() {
        let response = BridgeResponse {
            status: 204,
            headers: HeaderMap::new(),
            body: ResponseBody::Null,
        };
        assert!(response.bytes().unwrap().is_empty());
    }
}
