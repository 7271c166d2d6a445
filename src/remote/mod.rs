//! Remote Store Module
//!
//! The narrow contract a handle needs from the shared key-value service:
//! versioned get/put/delete against a named collection, plus a per-collection
//! event channel carrying [`SyncEvent`]s between handles.

mod http;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::sync::SyncEvent;

pub use http::HttpRemote;
pub use memory::{EventPage, MemoryRemote};

/// Buffer between a subscription's feeder and its consumer.
const SUBSCRIPTION_BUFFER: usize = 256;

// == Wire Values ==
/// A remote value and the collection version it was written at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned {
    pub value: Value,
    pub version: u64,
}

/// Acknowledgement of a remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutAck {
    pub version: u64,
}

/// Acknowledgement of a remote delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub version: u64,
    pub existed: bool,
}

// == Subscription ==
/// One item read from a collection's event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// A mutation published by some handle
    Event(SyncEvent),
    /// The subscriber fell behind and `missed` events were dropped
    Gap { missed: u64 },
}

/// Receiving end of a collection's event channel.
///
/// Dropping the subscription stops whatever task feeds it.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Delivery>,
}

impl Subscription {
    /// Creates a connected feeder/subscription pair.
    pub fn channel() -> (mpsc::Sender<Delivery>, Subscription) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (tx, Subscription { rx })
    }

    /// Waits for the next delivery. None once the feeder is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

// == Remote Store Trait ==
/// Client side of the shared key-value service.
///
/// Every failure to reach the service is a `CacheError::Transport`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads the authoritative value of a key.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned>>;

    /// Writes a value; the ack carries the version assigned to the write.
    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<PutAck>;

    /// Deletes a key; the ack carries the version assigned to the delete.
    async fn delete(&self, collection: &str, key: &str) -> Result<DeleteAck>;

    /// Number of keys in the collection.
    async fn len(&self, collection: &str) -> Result<usize>;

    /// Publishes an event on the event channel of `event.collection`.
    async fn publish(&self, event: SyncEvent) -> Result<()>;

    /// Subscribes to a collection's events, starting from now.
    ///
    /// Events of one origin arrive in publish order.
    async fn subscribe(&self, collection: &str) -> Result<Subscription>;
}

/// Shared, type-erased remote store.
pub type RemoteHandle = Arc<dyn RemoteStore>;
