//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use near_cache::remote::{DeleteAck, PutAck, Subscription, Versioned};
use near_cache::{RemoteStore, Result, SyncEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generous bound for eventual convergence in tests.
pub const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Value type used across scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestObject {
    pub value: String,
}

impl TestObject {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// Remote wrapper that counts remote reads made by one handle and can
/// delay them.
pub struct CountingRemote {
    inner: Arc<dyn RemoteStore>,
    gets: AtomicUsize,
    get_delay: Option<Duration>,
    stall_after: Option<Duration>,
}

impl CountingRemote {
    pub fn new(inner: Arc<dyn RemoteStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gets: AtomicUsize::new(0),
            get_delay: None,
            stall_after: None,
        })
    }

    pub fn slow(inner: Arc<dyn RemoteStore>, get_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gets: AtomicUsize::new(0),
            get_delay: Some(get_delay),
            stall_after: None,
        })
    }

    /// Reads and writes reach the inner store right away, but their results
    /// are handed back only after `stall`.
    pub fn stalling(inner: Arc<dyn RemoteStore>, stall: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gets: AtomicUsize::new(0),
            get_delay: None,
            stall_after: Some(stall),
        })
    }

    async fn stall(&self) {
        if let Some(stall) = self.stall_after {
            tokio::time::sleep(stall).await;
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for CountingRemote {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        let fetched = self.inner.get(collection, key).await;
        self.stall().await;
        fetched
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<PutAck> {
        let ack = self.inner.put(collection, key, value).await;
        self.stall().await;
        ack
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<DeleteAck> {
        self.inner.delete(collection, key).await
    }

    async fn len(&self, collection: &str) -> Result<usize> {
        self.inner.len(collection).await
    }

    async fn publish(&self, event: SyncEvent) -> Result<()> {
        self.inner.publish(event).await
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        self.inner.subscribe(collection).await
    }
}
