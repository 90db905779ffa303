//! Memoizing JSON client
//!
//! [`RequestCache`] sits in front of a [`Transport`] and serves responses
//! from disk while they are fresh. Missing, stale and corrupt entries are
//! refetched transparently. Faults in the cache layer never reach the
//! caller: a failed cached attempt falls back once to an uncached request.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore, KeyHasher, Lookup, RequestDescriptor, RollingHash};
use crate::config::CacheConfig;
use crate::error::{CacheIoError, Error, TransportError};
use crate::transport::{ReqwestTransport, Response, Transport};
use crate::Params;

/// Why the cached path did not produce a response
#[derive(Debug, Error)]
enum LocalError {
    /// The live request made on a miss failed; surfaced as-is
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The cache layer itself failed; triggers the uncached fallback
    #[error(transparent)]
    Cache(#[from] CacheIoError),
}

/// Disk-backed, TTL-aware cache for JSON GET requests
pub struct RequestCache {
    transport: Arc<dyn Transport>,
    store: CacheStore,
    hasher: Arc<dyn KeyHasher>,
    config: CacheConfig,
    /// Per-key locks, only used in single-flight mode
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RequestCache {
    /// Creates a cache that performs live requests with reqwest
    pub fn new(config: CacheConfig) -> Result<Self, reqwest::Error> {
        let transport = match config.timeout {
            Some(timeout) => ReqwestTransport::with_timeout(timeout)?,
            None => ReqwestTransport::new(),
        };
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a cache on top of a custom transport
    pub fn with_transport(config: CacheConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            store: CacheStore::new(config.cache_dir.clone()),
            hasher: Arc::new(RollingHash),
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the key hasher
    ///
    /// Entries written under a different hasher are simply never found.
    pub fn with_hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The cache key (and file name) used for a request
    pub fn key_for(&self, url: &str, params: &Params) -> String {
        self.hasher
            .key(&RequestDescriptor::new(url, params).serialize())
    }

    /// Fetches `url` with `params` as JSON, memoized for `ttl_seconds`
    ///
    /// # Arguments
    /// * `url` - Endpoint to request
    /// * `ttl_seconds` - How long a response stays fresh; `None` or `Some(0)`
    ///   bypasses the cache entirely
    /// * `params` - Query parameters, may be empty
    ///
    /// # Returns
    /// * `Ok(Value)` - The decoded body, from disk or from the network
    /// * `Err(Error::Transport)` - The live request failed outright
    /// * `Err(Error::UpstreamStatus)` - The live response status was not 200
    pub async fn get_json(
        &self,
        url: &str,
        ttl_seconds: Option<u64>,
        params: &Params,
    ) -> Result<Value, Error> {
        let response = match ttl_seconds.filter(|ttl| *ttl > 0) {
            None => self.fetch_live(url, params).await?,
            Some(ttl) => match self.cached(url, ttl, params).await {
                Ok(response) => response,
                Err(LocalError::Transport(e)) => return Err(e.into()),
                Err(LocalError::Cache(e)) => {
                    warn!(url, error = %e, "cache lookup failed, retrying without cache");
                    self.fetch_live(url, params).await?
                }
            },
        };

        check_status(url, params, response)
    }

    async fn cached(&self, url: &str, ttl: u64, params: &Params) -> Result<Response, LocalError> {
        let key = self.key_for(url, params);
        if !self.config.single_flight {
            return self.local_impl(&key, url, ttl, params).await;
        }

        let lock = self.acquire_key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.local_impl(&key, url, ttl, params).await
        };
        self.release_key_lock(&key, lock).await;
        result
    }

    async fn local_impl(
        &self,
        key: &str,
        url: &str,
        ttl: u64,
        params: &Params,
    ) -> Result<Response, LocalError> {
        match self.store.read(key).await? {
            Lookup::Fresh(entry) => {
                debug!(url, key, "cache hit");
                return Ok(Response::ok(entry.data));
            }
            Lookup::Missing => debug!(url, key, "cache miss"),
            lookup @ (Lookup::Stale | Lookup::Corrupt) => {
                debug!(url, key, ?lookup, "evicting cache entry");
                self.store.remove(key).await?;
            }
        }

        let response = self.fetch_live(url, params).await?;
        self.write_entry(key, ttl, &response).await;
        Ok(response)
    }

    async fn fetch_live(&self, url: &str, params: &Params) -> Result<Response, TransportError> {
        self.transport.perform_request(url, params).await
    }

    /// Persists a live response; failures are logged and otherwise ignored
    async fn write_entry(&self, key: &str, ttl: u64, response: &Response) {
        if response.status != 200 && !self.config.cache_error_responses {
            debug!(key, status = response.status, "not caching error response");
            return;
        }

        let entry = CacheEntry::new(response.body.clone(), ttl);
        match self.store.write(key, &entry).await {
            Ok(()) => debug!(key, expiry = entry.expiry, "cache entry written"),
            Err(e) if e.is_ignorable() => {}
            Err(e) => warn!(key, error = %e, "failed to write cache entry"),
        }
    }

    async fn acquire_key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference in the map, one held here: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
    }
}

fn check_status(url: &str, params: &Params, response: Response) -> Result<Value, Error> {
    if response.status == 200 {
        Ok(response.body)
    } else {
        Err(Error::UpstreamStatus {
            url: url.to_string(),
            status: response.status,
            params: serde_json::to_string(params).unwrap_or_default(),
        })
    }
}
