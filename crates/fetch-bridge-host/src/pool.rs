//! Single-entry pooled client cache.
//!
//! Typical call patterns hit one authority repeatedly, so the cache holds
//! exactly one client. A request for a different authority drops the cached
//! client (closing its idle connections) and builds a new one.

use tracing::debug;

use fetch_bridge_common::ErrorPayload;

use crate::client::{Authority, Connector};

/// Pooled client cache keyed by authority, capacity one.
pub struct PoolCache<C: Connector> {
    connector: C,
    current: Option<(Authority, C::Client)>,
    clients_created: u64,
}

impl<C: Connector> PoolCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            current: None,
            clients_created: 0,
        }
    }

    /// Get the client for `authority`, replacing the cached one if needed.
    pub fn client_for(&mut self, authority: &Authority) -> Result<&C::Client, ErrorPayload> {
        let cached = self
            .current
            .as_ref()
            .is_some_and(|(current, _)| current == authority);

        if !cached {
            if let Some((previous, _)) = self.current.take() {
                debug!(previous = %previous, next = %authority, "Authority changed, dropping pooled client");
            }
            let client = self.connector.connect(authority)?;
            self.clients_created += 1;
            self.current = Some((authority.clone(), client));
        }

        match &self.current {
            Some((_, client)) => Ok(client),
            None => Err(ErrorPayload::new("Error", "pooled client unavailable")),
        }
    }

    /// The authority of the cached client, if any.
    pub fn authority(&self) -> Option<&Authority> {
        self.current.as_ref().map(|(authority, _)| authority)
    }

    /// Total number of clients built over the cache's lifetime.
    pub fn clients_created(&self) -> u64 {
        self.clients_created
    }

    /// Drop the cached client.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl<C: Connector> std::fmt::Debug for PoolCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolCache")
            .field("authority", &self.authority())
            .field("clients_created", &self.clients_created)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::client::{OutboundRequest, PooledClient, UpstreamResponse};

    struct NullClient;

    #[async_trait]
    impl PooledClient for NullClient {
        async fn execute(&self, _request: OutboundRequest) -> Result<UpstreamResponse, ErrorPayload> {
            Err(ErrorPayload::new("TypeError", "not wired"))
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        built: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Connector for CountingConnector {
        type Client = NullClient;

        fn connect(&self, _authority: &Authority) -> Result<NullClient, ErrorPayload> {
            if self.fail {
                return Err(ErrorPayload::new("TypeError", "no client"));
            }
            self.built.fetch_add(1, Ordering::SeqCst);
            Ok(NullClient)
        }
    }

    fn authority(url: &str) -> Authority {
        Authority::from_url(&Url::parse(url).unwrap()).unwrap()
    }

    #[test]
    fn test_same_authority_reuses_client() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut cache = PoolCache::new(CountingConnector {
            built: Arc::clone(&built),
            fail: false,
        });

        for path in ["/a", "/b", "/c?x=1"] {
            cache
                .client_for(&authority(&format!("http://x.test{path}")))
                .unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(cache.clients_created(), 1);
    }

    #[test]
    fn test_authority_change_replaces_client() {
        let mut cache = PoolCache::new(CountingConnector::default());

        cache.client_for(&authority("http://x.test/")).unwrap();
        cache.client_for(&authority("http://y.test/")).unwrap();
        assert_eq!(cache.authority(), Some(&authority("http://y.test/")));

        cache.client_for(&authority("http://x.test/")).unwrap();
        assert_eq!(cache.clients_created(), 3);
        assert_eq!(cache.authority(), Some(&authority("http://x.test/")));
    }

    #[test]
    fn test_port_is_part_of_authority() {
        let mut cache = PoolCache::new(CountingConnector::default());
        cache.client_for(&authority("http://x.test:8080/")).unwrap();
        cache.client_for(&authority("http://x.test:8081/")).unwrap();
        assert_eq!(cache.clients_created(), 2);
    }

    #[test]
    fn test_connect_failure_leaves_cache_empty() {
        let mut cache = PoolCache::new(CountingConnector {
            built: Arc::default(),
            fail: true,
        });
        assert!(cache.client_for(&authority("http://x.test/")).is_err());
        assert!(cache.authority().is_none());
        assert_eq!(cache.clients_created(), 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = PoolCache::new(CountingConnector::default());
        cache.client_for(&authority("http://x.test/")).unwrap();
        cache.clear();
        assert!(cache.authority().is_none());
    }
}
