//! Cache key construction.

use std::fmt;

use crate::fingerprint::FolderFingerprint;
use crate::transport::Endpoint;

/// A listing-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a UID listing produced by search, sort or thread.
    ///
    /// Shape: `{S|N}/{T|N}/{user}@{host}:{port}/{folder}/{fingerprint}/{criteria}`.
    #[must_use]
    pub fn listing(
        use_sort: bool,
        use_threads: bool,
        endpoint: &Endpoint,
        folder: &str,
        fingerprint: &FolderFingerprint,
        criteria: &str,
    ) -> Self {
        Self(format!(
            "{}/{}/{endpoint}/{folder}/{fingerprint}/{criteria}",
            if use_sort { 'S' } else { 'N' },
            if use_threads { 'T' } else { 'N' },
        ))
    }

    /// Key for a folder's compiled thread map.
    #[must_use]
    pub fn thread_map(endpoint: &Endpoint, folder: &str, fingerprint: &FolderFingerprint) -> Self {
        Self(format!("ThreadsMap/{endpoint}/{folder}/{fingerprint}"))
    }

    /// The key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            user: "alice".into(),
            host: "imap.example.com".into(),
            port: 993,
        }
    }

    #[test]
    fn listing_key_shape() {
        let fp = FolderFingerprint::compute("INBOX", 5, 42);
        let key = CacheKey::listing(true, false, &endpoint(), "INBOX", &fp, "FROM bob");
        assert_eq!(
            key.as_str(),
            format!("S/N/alice@imap.example.com:993/INBOX/{fp}/FROM bob")
        );
    }

    #[test]
    fn thread_key_shape() {
        let fp = FolderFingerprint::compute("Lists", 1, 2);
        let key = CacheKey::thread_map(&endpoint(), "Lists", &fp);
        assert_eq!(
            key.to_string(),
            format!("ThreadsMap/alice@imap.example.com:993/Lists/{fp}")
        );
    }
}
