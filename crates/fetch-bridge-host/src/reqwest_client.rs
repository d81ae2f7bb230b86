//! `reqwest`-backed pooled client.
//!
//! One [`reqwest::Client`] is built per authority with the pool settings from
//! [`PoolConfig`]. Network failures are reported the way a platform `fetch`
//! reports them: a `TypeError: fetch failed` whose cause carries the detail.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use fetch_bridge_common::{ErrorPayload, PoolConfig};

use crate::client::{Authority, Connector, OutboundRequest, PooledClient, UpstreamBody, UpstreamResponse};

/// Connector producing `reqwest` clients.
#[derive(Debug, Clone, Default)]
pub struct ReqwestConnector {
    config: PoolConfig,
}

impl ReqwestConnector {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }
}

impl Connector for ReqwestConnector {
    type Client = ReqwestClient;

    fn connect(&self, authority: &Authority) -> Result<ReqwestClient, ErrorPayload> {
        let client = Client::builder()
            .pool_max_idle_per_host(self.config.max_idle_per_host)
            .pool_idle_timeout(self.config.idle_timeout())
            .connect_timeout(self.config.connect_timeout())
            .user_agent(self.config.user_agent.as_str())
            .build()
            .map_err(|e| ErrorPayload::from_error("TypeError", &e))?;

        debug!(authority = %authority, "Created pooled client");

        Ok(ReqwestClient {
            client,
            authority: authority.clone(),
        })
    }
}

/// A `reqwest` client bound to one authority.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    authority: Authority,
}

impl ReqwestClient {
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

#[async_trait]
impl PooledClient for ReqwestClient {
    async fn execute(&self, request: OutboundRequest) -> Result<UpstreamResponse, ErrorPayload> {
        let mut req_builder = self.client.request(request.method, request.url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.send().await.map_err(fetch_failed)?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();

        Ok(UpstreamResponse {
            status,
            headers,
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl UpstreamBody for ReqwestBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, ErrorPayload> {
        self.0.chunk().await.map_err(fetch_failed)
    }
}

/// Map a `reqwest` error to the payload a platform `fetch` would raise.
fn fetch_failed(err: reqwest::Error) -> ErrorPayload {
    let cause = ErrorPayload::from_error("Error", &err);
    if err.is_timeout() {
        ErrorPayload::new("TimeoutError", "fetch timed out").with_cause(cause)
    } else if err.is_builder() {
        ErrorPayload::new("TypeError", "invalid request").with_cause(cause)
    } else {
        ErrorPayload::new("TypeError", "fetch failed").with_cause(cause)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use url::Url;

    use super::*;

    #[test]
    fn test_connect_builds_client_for_authority() {
        let connector = ReqwestConnector::new(PoolConfig::default());
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let authority = Authority::from_url(&url).unwrap();

        let client = connector.connect(&authority).unwrap();
        assert_eq!(client.authority(), &authority);
    }

    #[tokio::test]
    async fn test_connection_refused_is_type_error() {
        // Port 9 (discard) is closed on test machines.
        let connector = ReqwestConnector::new(PoolConfig {
            connect_timeout_ms: 500,
            ..Default::default()
        });
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let client = connector.connect(&Authority::from_url(&url).unwrap()).unwrap();

        let err = client
            .execute(OutboundRequest {
                method: Method::GET,
                url,
                headers: Vec::new(),
                body: None,
            })
            .await
            .unwrap_err();

        assert!(err.name == "TypeError" || err.name == "TimeoutError");
        assert!(err.cause.is_some());
    }

    #[tokio::test]
    async fn test_invalid_header_is_reported() {
        let connector = ReqwestConnector::default();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let client = connector.connect(&Authority::from_url(&url).unwrap()).unwrap();

        let err = client
            .execute(OutboundRequest {
                method: Method::GET,
                url,
                headers: vec![("bad header".into(), "v".into())],
                body: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.name, "TypeError");
        assert_eq!(err.message, "invalid request");
    }
}
