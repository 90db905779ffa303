//! Error types for the request cache

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of [`RequestCache::get_json`](crate::RequestCache::get_json)
///
/// Cache-internal faults never appear here; only failures of the request
/// that actually executed.
#[derive(Debug, Error)]
pub enum Error {
    /// The network call failed outright
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The live response came back with a status other than 200
    #[error("request to {url} failed with status {status} (params: {params})")]
    UpstreamStatus {
        url: String,
        status: u16,
        /// Query parameters serialized as JSON
        params: String,
    },
}

/// Failure of the underlying HTTP transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed
    #[error("HTTP request to {url} failed (params: {params}): {source}")]
    RequestFailed {
        url: String,
        /// Query parameters serialized as JSON
        params: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other transport-level failure (used by non-reqwest transports)
    #[error("HTTP request to {url} failed (params: {params}): {message}")]
    Other {
        url: String,
        params: String,
        message: String,
    },
}

/// Failure inside the on-disk cache layer
///
/// Never returned to callers of the cache; logged, and on the read path it
/// triggers the one-shot uncached fallback.
#[derive(Debug, Error)]
pub enum CacheIoError {
    #[error("failed to read cache file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write cache file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to rename temp file over {}: {source}", path.display())]
    Rename { path: PathBuf, source: io::Error },

    #[error("failed to remove cache file {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cache I/O task failed: {0}")]
    Task(String),
}

impl CacheIoError {
    /// Whether this error belongs to the benign "resource not found" class
    ///
    /// These arise when a concurrent writer or deleter races on the same key
    /// and are dropped without logging.
    pub fn is_ignorable(&self) -> bool {
        match self {
            CacheIoError::Read { source, .. }
            | CacheIoError::Write { source, .. }
            | CacheIoError::Rename { source, .. }
            | CacheIoError::Remove { source, .. } => is_ignorable_io(source),
            CacheIoError::Serialize(_) | CacheIoError::Task(_) => false,
        }
    }
}

/// The ignorable I/O error class: the file (or its directory) is already gone
pub fn is_ignorable_io(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}
