//! Cache key derivation
//!
//! A cache key is derived from the JSON serialization of the request
//! descriptor (URL plus query parameters). The default hasher is a 32-bit
//! signed rolling hash: fast, not cryptographic, and collisions silently
//! alias two different requests to the same cache slot.

use serde::Serialize;

use crate::Params;

/// The request as seen by the cache: everything that identifies a response
#[derive(Debug, Serialize)]
pub struct RequestDescriptor<'a> {
    /// Endpoint URL
    pub url: &'a str,
    /// Query parameters, ordered by name
    pub params: &'a Params,
}

impl<'a> RequestDescriptor<'a> {
    pub fn new(url: &'a str, params: &'a Params) -> Self {
        Self { url, params }
    }

    /// Serializes the descriptor to the string the key is hashed from
    ///
    /// `Params` is a sorted map, so two requests with the same parameter set
    /// serialize identically regardless of insertion order.
    pub fn serialize(&self) -> String {
        // A struct of &str and a string map cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Maps a serialized request descriptor to a file name inside the cache directory
///
/// Implementations must return a string that is a valid single path component.
pub trait KeyHasher: Send + Sync {
    fn key(&self, descriptor: &str) -> String;
}

/// The default hasher: `hash = (hash << 5) - hash + unit` over UTF-16 code units
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingHash;

impl KeyHasher for RollingHash {
    fn key(&self, descriptor: &str) -> String {
        rolling_hash(descriptor).to_string()
    }
}

/// Computes the 32-bit signed rolling hash of `input`
///
/// Returns 0 for an empty string. Arithmetic wraps at 32 bits.
pub fn rolling_hash(input: &str) -> i32 {
    if input.is_empty() {
        return 0;
    }
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}
