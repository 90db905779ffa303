//! On-disk response cache
//!
//! Cache entries are JSON files named by a hash of the request descriptor,
//! each holding the response body and an absolute expiry timestamp. Entries
//! are replaced with temp-file-then-rename so readers never observe a
//! partial write.

mod entry;
mod key;
mod store;

pub use entry::CacheEntry;
pub use key::{rolling_hash, KeyHasher, RequestDescriptor, RollingHash};
pub use store::{CacheStore, Lookup};
