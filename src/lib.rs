//! Disk-backed, TTL-aware response cache for JSON HTTP endpoints
//!
//! [`RequestCache::get_json`] memoizes GET requests keyed by URL and query
//! parameters. Fresh entries are served from disk, everything else goes to
//! the network, and faults in the cache layer never reach the caller.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod rates;
pub mod transport;

use std::collections::BTreeMap;

pub use client::RequestCache;
pub use config::CacheConfig;
pub use error::{Error, TransportError};

/// Query parameters, ordered by name
pub type Params = BTreeMap<String, String>;
