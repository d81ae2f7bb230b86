//! Pooled client abstraction consumed by the dispatcher.
//!
//! The dispatcher never talks to an HTTP library directly. It asks a
//! [`Connector`] for a [`PooledClient`] bound to one [`Authority`] and drives
//! the response body through [`UpstreamBody`]. The production implementation
//! lives in [`crate::reqwest_client`].

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use url::Url;

use fetch_bridge_common::ErrorPayload;

/// Scheme, host and port of a URL: the key of the pool cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    scheme: String,
    host: String,
    port: u16,
}

impl Authority {
    /// Extract the authority of a URL.
    ///
    /// Returns `None` for URLs without a host or a known port
    /// (e.g. `data:` or `file:` URLs).
    pub fn from_url(url: &Url) -> Option<Self> {
        Some(Self {
            scheme: url.scheme().to_string(),
            host: url.host_str()?.to_ascii_lowercase(),
            port: url.port_or_known_default()?,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A request ready to be executed by a pooled client.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// Response head plus a body that has not been read yet.
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn UpstreamBody>,
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Incrementally readable response body.
#[async_trait]
pub trait UpstreamBody: Send {
    /// Read the next chunk, or `None` at end of body.
    async fn chunk(&mut self) -> Result<Option<Bytes>, ErrorPayload>;
}

/// A client holding reusable connections to one authority.
#[async_trait]
pub trait PooledClient: Send + Sync {
    /// Execute a request and return once the response head is available.
    async fn execute(&self, request: OutboundRequest) -> Result<UpstreamResponse, ErrorPayload>;
}

/// Builds pooled clients.
pub trait Connector: Send + 'static {
    type Client: PooledClient + 'static;

    /// Create a client for `authority`.
    fn connect(&self, authority: &Authority) -> Result<Self::Client, ErrorPayload>;
}
