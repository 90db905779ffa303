//! Configuration for a [`RequestCache`](crate::RequestCache)
//!
//! Set once when the cache is built and read-only afterwards. Tests get
//! isolation by pointing each cache at its own directory.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the default cache directory under the system temp dir
pub const DEFAULT_CACHE_DIR_NAME: &str = "request-cache";

/// Settings for the request cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Directory holding one file per cache key
    pub cache_dir: PathBuf,
    /// Serialize concurrent requests for the same key so only one goes live
    ///
    /// Off by default: concurrent misses for a key each fetch independently.
    pub single_flight: bool,
    /// Whether responses with a status other than 200 are written to disk
    ///
    /// On by default. A cached error body is later served as a success until
    /// it expires.
    pub cache_error_responses: bool,
    /// Request timeout for the default transport, if any
    pub timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            single_flight: false,
            cache_error_responses: true,
            timeout: None,
        }
    }
}

impl CacheConfig {
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn with_cache_error_responses(mut self, enabled: bool) -> Self {
        self.cache_error_responses = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// `<system temp dir>/request-cache`
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME)
}
