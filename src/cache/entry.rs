//! The persisted cache unit

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper stored on disk for every cached response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The response body
    pub data: Value,
    /// Absolute expiry as milliseconds since the Unix epoch
    pub expiry: i64,
}

impl CacheEntry {
    /// Creates an entry that expires `ttl_seconds` from now
    pub fn new(data: Value, ttl_seconds: u64) -> Self {
        let ttl_millis = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expiry = Utc::now().timestamp_millis().saturating_add(ttl_millis);
        Self { data, expiry }
    }

    /// Whether the entry is still valid at `now_millis`
    pub fn is_fresh_at(&self, now_millis: i64) -> bool {
        now_millis < self.expiry
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now().timestamp_millis())
    }
}
