//! Synchronization Engine
//!
//! Applies peer events from a collection's event channel to one handle's
//! local store. Application is asynchronous to the writes that produced the
//! events: a peer may keep serving the previous value, or a miss, until its
//! engine has caught up.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{HandleId, SyncAction, SyncEvent, SyncStrategy};
use crate::cache::SharedStore;
use crate::remote::{Delivery, Subscription};

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Published by this handle; already reflected locally
    OwnEvent,
    /// The strategy says to do nothing
    Ignored,
    /// The local entry was dropped (or was already absent)
    Removed,
    /// The local entry now holds the event payload
    Replaced,
    /// The local entry is newer than the event
    Stale,
    /// The event was malformed; the local entry, if any, was dropped
    Rejected,
}

// == Sync Engine ==
/// Event consumer bound to one handle's store and strategy.
pub struct SyncEngine<V> {
    collection: String,
    origin: HandleId,
    strategy: SyncStrategy,
    store: SharedStore<V>,
    changed: Notify,
}

impl<V> SyncEngine<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        collection: impl Into<String>,
        origin: HandleId,
        strategy: SyncStrategy,
        store: SharedStore<V>,
    ) -> Self {
        Self {
            collection: collection.into(),
            origin,
            strategy,
            store,
            changed: Notify::new(),
        }
    }

    /// Notified after every applied event, gap or local write.
    pub fn changed(&self) -> &Notify {
        &self.changed
    }

    /// Wakes everyone waiting on [`changed`](Self::changed).
    pub fn notify_changed(&self) {
        self.changed.notify_waiters();
    }

    // == Spawn ==
    /// Starts consuming a subscription on its own task.
    ///
    /// The task ends when the subscription closes or the handle is aborted.
    pub fn spawn(self: Arc<Self>, mut subscription: Subscription) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Sync engine started for collection '{}' ({} strategy)",
                self.collection, self.strategy
            );

            while let Some(delivery) = subscription.recv().await {
                match delivery {
                    Delivery::Event(event) => {
                        self.apply(&event).await;
                    }
                    Delivery::Gap { missed } => self.handle_gap(missed).await,
                }
            }

            warn!(
                "Event channel for collection '{}' closed, local cache no longer synchronized",
                self.collection
            );
        })
    }

    // == Apply ==
    /// Applies one event to the local store according to the strategy.
    ///
    /// Never fails: malformed or out-of-order events are logged and skipped.
    pub async fn apply(&self, event: &SyncEvent) -> Applied {
        if event.origin == self.origin {
            return Applied::OwnEvent;
        }
        if event.collection != self.collection {
            warn!(
                "Dropping event for collection '{}' delivered to '{}'",
                event.collection, self.collection
            );
            return Applied::Rejected;
        }

        let outcome = match self.strategy.action_for(event.kind) {
            SyncAction::Ignore => Applied::Ignored,
            SyncAction::Remove => {
                let mut store = self.store.write().await;
                if store.remove(&event.key).is_some() {
                    store.record_sync_applied();
                }
                Applied::Removed
            }
            SyncAction::Replace => self.replace(event).await,
        };

        debug!(
            "Applied {:?} event for key '{}' (sequence {}): {:?}",
            event.kind, event.key, event.sequence, outcome
        );
        self.notify_changed();
        outcome
    }

    async fn replace(&self, event: &SyncEvent) -> Applied {
        let decoded = match &event.payload {
            Some(payload) => serde_json::from_value::<V>(payload.clone()).map_err(|e| e.to_string()),
            None => Err("update event without payload".to_string()),
        };

        let mut store = self.store.write().await;
        match decoded {
            Ok(value) => {
                if store.insert_if_newer(event.key.clone(), value, Some(event.sequence)) {
                    store.record_sync_applied();
                    Applied::Replaced
                } else {
                    Applied::Stale
                }
            }
            Err(reason) => {
                warn!(
                    "Rejecting update for key '{}' in '{}': {}",
                    event.key, self.collection, reason
                );
                store.remove(&event.key);
                Applied::Rejected
            }
        }
    }

    async fn handle_gap(&self, missed: u64) {
        let dropped = self.store.write().await.clear();
        warn!(
            "Missed {} events on collection '{}', dropped {} local entries",
            missed, self.collection, dropped
        );
        self.notify_changed();
    }
}
