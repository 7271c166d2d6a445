//! TTL Sweep Task
//!
//! Background task that periodically drops expired entries from a local
//! store. Expiry is already enforced lazily on lookup; the sweep only
//! reclaims memory held by entries nobody reads again.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;

/// Spawns a task that sweeps expired entries every `interval`.
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop sweeping.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(LocalCacheStore::<String>::new(None, Some(ttl))));
/// let sweeper = spawn_cleanup_task(store.clone(), Duration::from_secs(1));
/// // Later, on close:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task<V>(store: SharedStore<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}
