//! Cache Module
//!
//! The per-handle local store: TTL expiration, LRU eviction and statistics.

mod entry;
mod lru;
mod stats;
mod store;


pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::LocalCacheStore;

/// A local store shared between a handle, its sync engine and its sweeper.
pub type SharedStore<V> = std::sync::Arc<tokio::sync::RwLock<LocalCacheStore<V>>>;
