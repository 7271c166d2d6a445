//! In-process remote store.
//!
//! Holds the authoritative map of every collection plus a bounded event log
//! per collection. Subscribers and long-poll readers follow the log with a
//! cursor; a reader whose cursor fell off the front of the log is told how
//! many events it missed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info};

use super::{DeleteAck, Delivery, PutAck, RemoteStore, Subscription, Versioned};
use crate::error::{CacheError, Result};
use crate::sync::SyncEvent;

/// Default number of events retained per collection.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1024;

/// How long a subscription feeder parks before re-checking its receiver.
const FEEDER_WAIT: Duration = Duration::from_secs(30);

// == Event Page ==
/// A slice of a collection's event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    /// Events from the requested cursor onward, in publish order
    pub events: Vec<SyncEvent>,
    /// Cursor to pass on the next read
    pub next: u64,
    /// Events that were trimmed before the reader got to them
    pub missed: u64,
}

// == Collection ==
#[derive(Debug, Default)]
struct CollectionState {
    entries: HashMap<String, Versioned>,
    /// Last version handed out by a put or delete
    version: u64,
    /// (log index, event), oldest first
    log: VecDeque<(u64, SyncEvent)>,
    /// Index the next published event will get
    next_index: u64,
}

impl CollectionState {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn page_from(&self, cursor: Option<u64>) -> EventPage {
        let Some(cursor) = cursor else {
            return EventPage {
                events: Vec::new(),
                next: self.next_index,
                missed: 0,
            };
        };

        let oldest = self
            .log
            .front()
            .map(|(index, _)| *index)
            .unwrap_or(self.next_index);
        let missed = oldest.saturating_sub(cursor);
        let events = self
            .log
            .iter()
            .filter(|(index, _)| *index >= cursor)
            .map(|(_, event)| event.clone())
            .collect();

        EventPage {
            events,
            next: self.next_index.max(cursor),
            missed,
        }
    }
}

#[derive(Debug, Default)]
struct Collection {
    state: Mutex<CollectionState>,
    published: Notify,
}

// == Memory Remote ==
/// Remote store living in this process.
///
/// Shared between handles through an `Arc`, it behaves like one remote
/// service: every handle sees the same collections and event channels.
#[derive(Debug)]
pub struct MemoryRemote {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    event_log_capacity: usize,
    connected: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl MemoryRemote {
    /// Creates an empty store retaining `event_log_capacity` events per collection.
    pub fn new(event_log_capacity: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            event_log_capacity: event_log_capacity.max(1),
            connected: AtomicBool::new(true),
        }
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn disconnect(&self) {
        info!("Memory remote disconnected");
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Undoes [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        info!("Memory remote reconnected");
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // == Event Log Reads ==
    /// Returns the events of a collection starting at `cursor`.
    ///
    /// A `None` cursor returns no events and the current head, which is
    /// where a new reader starts.
    pub async fn events_from(&self, collection: &str, cursor: Option<u64>) -> EventPage {
        let collection = self.collection(collection).await;
        let state = collection.state.lock().await;
        state.page_from(cursor)
    }

    /// Like [`events_from`](Self::events_from) but waits up to `wait` for
    /// at least one event when none is available yet.
    pub async fn wait_for_events(
        &self,
        collection: &str,
        cursor: Option<u64>,
        wait: Duration,
    ) -> EventPage {
        let collection = self.collection(collection).await;
        wait_page(&collection, cursor, wait).await
    }

    async fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(collection) = self.collections.read().await.get(name) {
            return collection.clone();
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating collection '{}'", name);
                Arc::new(Collection::default())
            })
            .clone()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CacheError::Transport("remote store unavailable".to_string()))
        }
    }
}

async fn wait_page(collection: &Collection, cursor: Option<u64>, wait: Duration) -> EventPage {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        // Registered before the check so a publish in between is not lost.
        let published = collection.published.notified();
        let page = collection.state.lock().await.page_from(cursor);
        if cursor.is_none() || !page.events.is_empty() || page.missed > 0 {
            return page;
        }
        if tokio::time::timeout_at(deadline, published).await.is_err() {
            return page;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned>> {
        self.ensure_connected()?;
        let collection = self.collection(collection).await;
        let state = collection.state.lock().await;
        Ok(state.entries.get(key).cloned())
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<PutAck> {
        self.ensure_connected()?;
        let collection = self.collection(collection).await;
        let mut state = collection.state.lock().await;
        let version = state.next_version();
        state
            .entries
            .insert(key.to_string(), Versioned { value, version });
        Ok(PutAck { version })
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<DeleteAck> {
        self.ensure_connected()?;
        let collection = self.collection(collection).await;
        let mut state = collection.state.lock().await;
        let version = state.next_version();
        let existed = state.entries.remove(key).is_some();
        Ok(DeleteAck { version, existed })
    }

    async fn len(&self, collection: &str) -> Result<usize> {
        self.ensure_connected()?;
        let collection = self.collection(collection).await;
        let state = collection.state.lock().await;
        Ok(state.entries.len())
    }

    async fn publish(&self, event: SyncEvent) -> Result<()> {
        self.ensure_connected()?;
        let collection = self.collection(&event.collection).await;
        {
            let mut state = collection.state.lock().await;
            let index = state.next_index;
            state.next_index += 1;
            state.log.push_back((index, event));
            while state.log.len() > self.event_log_capacity {
                state.log.pop_front();
            }
        }
        collection.published.notify_waiters();
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        self.ensure_connected()?;
        let collection = self.collection(collection).await;
        let mut cursor = collection.state.lock().await.next_index;
        let (tx, subscription) = Subscription::channel();

        tokio::spawn(async move {
            loop {
                let page = tokio::select! {
                    _ = tx.closed() => break,
                    page = wait_page(&collection, Some(cursor), FEEDER_WAIT) => page,
                };
                cursor = page.next;

                if page.missed > 0 && tx.send(Delivery::Gap { missed: page.missed }).await.is_err() {
                    break;
                }
                for event in page.events {
                    if tx.send(Delivery::Event(event)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(subscription)
    }
}
