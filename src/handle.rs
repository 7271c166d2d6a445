//! Cache Handle
//!
//! The public object bound to one remote collection. A handle always sees
//! its own writes immediately; writes made through other handles become
//! visible eventually, once its sync engine has applied the matching event.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheStats, LocalCacheStore, SharedStore};
use crate::config::{HandleConfig, MissPolicy};
use crate::error::{CacheError, Result};
use crate::remote::RemoteHandle;
use crate::sync::{Applied, HandleId, SyncEngine, SyncEvent, SyncEventKind, SyncStrategy};
use crate::tasks::spawn_cleanup_task;

// == Cache Handle ==
/// Local near cache over one collection of a shared remote store.
pub struct CacheHandle<V> {
    id: HandleId,
    collection: String,
    config: HandleConfig,
    remote: RemoteHandle,
    store: SharedStore<V>,
    engine: Arc<SyncEngine<V>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<V> CacheHandle<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Open ==
    /// Validates the configuration, subscribes to the collection's event
    /// channel and starts the sync engine.
    ///
    /// Handles with the `None` strategy do not subscribe at all.
    pub async fn open(
        remote: RemoteHandle,
        collection: impl Into<String>,
        config: HandleConfig,
    ) -> Result<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(CacheError::Configuration(
                "collection name must not be empty".to_string(),
            ));
        }
        config.validate()?;

        let id = Uuid::new_v4();
        let store: SharedStore<V> = Arc::new(RwLock::new(LocalCacheStore::new(
            config.max_entries,
            config.time_to_live,
        )));
        let engine = Arc::new(SyncEngine::new(
            collection.clone(),
            id,
            config.sync_strategy,
            store.clone(),
        ));

        let mut tasks = Vec::new();
        if config.sync_strategy.needs_subscription() {
            let subscription =
                with_timeout(config.transport_timeout, remote.subscribe(&collection)).await?;
            tasks.push(engine.clone().spawn(subscription));
        }
        if let Some(interval) = config.cleanup_interval {
            tasks.push(spawn_cleanup_task(store.clone(), interval));
        }

        info!(
            "Opened handle {} on collection '{}' (strategy={}, ttl={:?}, max_entries={:?})",
            id, collection, config.sync_strategy, config.time_to_live, config.max_entries
        );

        Ok(Self {
            id,
            collection,
            config,
            remote,
            store,
            engine,
            tasks: Mutex::new(tasks),
            closed: AtomicBool::new(false),
        })
    }

    // == Get ==
    /// Returns the value of a key.
    ///
    /// Served from the local store when a live entry exists; otherwise read
    /// from the remote store and cached. A transport failure on that remote
    /// read is returned or reported as absent according to the miss policy.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        self.ensure_open()?;

        let epoch = {
            let mut store = self.store.write().await;
            if let Some(entry) = store.lookup(key) {
                return Ok(Some(entry.value));
            }
            store.invalidation_epoch()
        };

        let fetched = match self.remote_call(self.remote.get(&self.collection, key)).await {
            Ok(fetched) => fetched,
            Err(err) if err.is_retryable() && self.config.miss_policy == MissPolicy::TreatAsAbsent => {
                warn!(
                    "Remote read of '{}' in '{}' failed, treating as absent: {}",
                    key, self.collection, err
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let Some(versioned) = fetched else {
            return Ok(None);
        };
        let value: V = serde_json::from_value(versioned.value)?;

        let mut store = self.store.write().await;
        self.ensure_open()?;
        if store.fill_if_current(key, value.clone(), Some(versioned.version), epoch) {
            debug!("Cached '{}' at version {}", key, versioned.version);
        } else if let Some(entry) = store.peek(key) {
            // A newer value arrived from a peer while we were fetching.
            return Ok(Some(entry.value.clone()));
        } else {
            debug!(
                "Not caching '{}' at version {}, invalidated during fetch",
                key, versioned.version
            );
        }
        Ok(Some(value))
    }

    // == Put ==
    /// Writes a value through to the remote store, caches it locally and
    /// announces the change to peer handles.
    ///
    /// Fails only if the remote write fails. Peers are not waited for.
    pub async fn put(&self, key: &str, value: V) -> Result<()> {
        self.ensure_open()?;

        let payload = serde_json::to_value(&value)?;
        let epoch = self.store.read().await.invalidation_epoch();
        let ack = self
            .remote_call(self.remote.put(&self.collection, key, payload.clone()))
            .await?;

        {
            let mut store = self.store.write().await;
            self.ensure_open()?;
            if !store.fill_if_current(key, value, Some(ack.version), epoch) {
                // Something was invalidated meanwhile. Keep a newer peer value,
                // otherwise let the next read go to the remote store.
                let outdated = store
                    .peek(key)
                    .is_some_and(|entry| entry.is_superseded_by(Some(ack.version)));
                if outdated {
                    store.remove(key);
                }
            }
        }
        self.engine.notify_changed();

        let event = match self.config.sync_strategy.outgoing_kind() {
            SyncEventKind::Update => {
                SyncEvent::update(self.collection.as_str(), key, payload, self.id, ack.version)
            }
            SyncEventKind::Invalidate => {
                SyncEvent::invalidate(self.collection.as_str(), key, self.id, ack.version)
            }
        };
        self.publish(event).await;
        Ok(())
    }

    // == Remove ==
    /// Deletes a key remotely and locally and tells peers to drop it.
    ///
    /// Returns whether the key existed remotely.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        let ack = self
            .remote_call(self.remote.delete(&self.collection, key))
            .await?;
        {
            let mut store = self.store.write().await;
            self.ensure_open()?;
            store.remove(key);
        }
        self.engine.notify_changed();

        self.publish(SyncEvent::invalidate(
            self.collection.as_str(),
            key,
            self.id,
            ack.version,
        ))
        .await;
        Ok(ack.existed)
    }

    // == Invalidate Local ==
    /// Clears this handle's local store only. Returns the number of entries
    /// dropped; calling it again right away drops nothing.
    pub async fn invalidate_local(&self) -> usize {
        let dropped = self.store.write().await.clear();
        debug!(
            "Handle {} dropped {} local entries of '{}'",
            self.id, dropped, self.collection
        );
        self.engine.notify_changed();
        dropped
    }

    // == Close ==
    /// Stops the sync engine and sweeper and releases the local store.
    ///
    /// Idempotent. Later calls to `get`, `put` and `remove` fail with
    /// `CacheError::Closed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        let stats = {
            let mut store = self.store.write().await;
            let stats = store.stats();
            store.clear();
            stats
        };
        self.engine.notify_changed();
        info!(
            "Closed handle {} on collection '{}' (hit rate {:.2})",
            self.id,
            self.collection,
            stats.hit_rate()
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // == Convergence ==
    /// Waits until the local store holds a value for `key` that satisfies
    /// `predicate`, without touching the remote store.
    ///
    /// Wakes on every applied event instead of polling. Returns None if the
    /// deadline passes first.
    pub async fn await_cached<F>(&self, key: &str, timeout: Duration, predicate: F) -> Option<V>
    where
        F: Fn(&V) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.engine.changed().notified();
            if let Some(entry) = self.store.read().await.peek(key) {
                if predicate(&entry.value) {
                    return Some(entry.value.clone());
                }
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return None;
            }
        }
    }

    /// Waits until the local store no longer holds `key`. Returns false if
    /// the deadline passes first.
    pub async fn await_evicted(&self, key: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.engine.changed().notified();
            if self.store.read().await.peek(key).is_none() {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return false;
            }
        }
    }

    /// Applies an event as if it had arrived on the event channel.
    pub async fn apply_event(&self, event: &SyncEvent) -> Applied {
        self.engine.apply(event).await
    }

    // == Introspection ==
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn strategy(&self) -> SyncStrategy {
        self.config.sync_strategy
    }

    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Returns true if a live entry for `key` is cached locally.
    pub async fn contains_local(&self, key: &str) -> bool {
        self.store.read().await.peek(key).is_some()
    }

    /// Number of locally cached entries.
    pub async fn local_len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Approximate bytes held by the local store.
    pub async fn size_in_memory(&self) -> usize {
        self.store.read().await.size_in_memory()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Number of keys in the remote collection.
    pub async fn remote_len(&self) -> Result<usize> {
        self.ensure_open()?;
        self.remote_call(self.remote.len(&self.collection)).await
    }

    async fn publish(&self, event: SyncEvent) {
        let key = event.key.clone();
        if let Err(err) = self.remote_call(self.remote.publish(event)).await {
            warn!(
                "Failed to publish change of '{}' in '{}', peers may serve stale data: {}",
                key, self.collection, err
            );
        }
    }

    async fn remote_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        with_timeout(self.config.transport_timeout, call).await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<V> Drop for CacheHandle<V> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Bounds a remote call, turning an elapsed deadline into a transport error.
async fn with_timeout<T>(timeout: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Transport(format!(
            "remote call timed out after {:?}",
            timeout
        ))),
    }
}
