//! Cache Entry Module
//!
//! Defines a single local cache entry with TTL and version metadata.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A locally cached value plus the metadata the eviction and sync layers need.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cache key
    pub key: String,
    /// The cached value
    pub value: V,
    /// When the entry was written into the local store
    pub inserted_at: Instant,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Remote version of the value, None if unknown
    pub version: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    ///
    /// # Arguments
    /// * `key` - The cache key
    /// * `value` - The value to cache
    /// * `ttl` - Optional time-to-live; `expires_at` is `inserted_at + ttl`
    pub fn new(key: impl Into<String>, value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            key: key.into(),
            value,
            inserted_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            version: None,
        }
    }

    /// Attaches the remote version this value was read or written at.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now >= expires_at`, so it stops being
    /// served the instant its TTL has fully elapsed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Returns true if this entry may be replaced by a value at `version`.
    ///
    /// Unversioned entries always yield; a versioned entry only yields to a
    /// strictly newer version.
    pub fn is_superseded_by(&self, version: Option<u64>) -> bool {
        match (self.version, version) {
            (Some(current), Some(incoming)) => incoming > current,
            _ => true,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("key1", "test_value".to_string(), None);

        assert_eq!(entry.key, "key1");
        assert_eq!(entry.value, "test_value");
        assert!(entry.expires_at.is_none());
        assert!(entry.version.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expires_at_is_inserted_plus_ttl() {
        let ttl = Duration::from_secs(60);
        let entry = CacheEntry::new("key1", 1u32, Some(ttl));

        assert_eq!(entry.expires_at, Some(entry.inserted_at + ttl));
        assert!(!entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("key1", 1u32, Some(Duration::from_secs(1)));
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("key1", 1u32, Some(Duration::from_secs(10)));
        let expires = entry.expires_at.unwrap();

        assert!(entry.is_expired_at(expires), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(expires - Duration::from_millis(1)));
    }

    #[test]
    fn test_superseded_by_versions() {
        let unversioned = CacheEntry::new("k", 1u32, None);
        assert!(unversioned.is_superseded_by(Some(1)));
        assert!(unversioned.is_superseded_by(None));

        let versioned = CacheEntry::new("k", 1u32, None).with_version(5);
        assert!(versioned.is_superseded_by(Some(6)));
        assert!(!versioned.is_superseded_by(Some(5)));
        assert!(!versioned.is_superseded_by(Some(4)));
        assert!(versioned.is_superseded_by(None));
    }
}
