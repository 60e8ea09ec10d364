//! In-process cache backend.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ListingCache;
use crate::Result;

/// Listing cache held in memory, shareable across sessions via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryListingCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryListingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl ListingCache for MemoryListingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryListingCache::new();
        assert!(cache.is_ready());
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", b"[1,2]").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"[1,2]".to_vec()));
        cache.set("k", b"[3]").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"[3]".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_writers_same_key() {
        let cache = Arc::new(MemoryListingCache::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set("same", b"[9,8,7]").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.get("same").await.unwrap(), Some(b"[9,8,7]".to_vec()));
    }
}
