//! Listing cache.
//!
//! Listing and thread results are pure functions of the folder
//! fingerprint and the request, so they can be shared between sessions.
//! Entries are never evicted here; expiry belongs to the backend.

mod key;
mod memory;
mod sqlite;

pub use key::CacheKey;
pub use memory::MemoryListingCache;
pub use sqlite::SqliteListingCache;

use std::future::Future;

use crate::Result;

/// Storage contract for the listing cache.
///
/// Implementations must allow concurrent readers. Concurrent writers to
/// the same key store equal values, so the last write may simply win.
pub trait ListingCache: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Stores a value, replacing any previous one.
    fn set(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Returns false if the backend is not usable; caching is then skipped.
    fn is_ready(&self) -> bool {
        true
    }
}
