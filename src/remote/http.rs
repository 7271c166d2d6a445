//! HTTP client for the bundled remote store service.
//!
//! Entries map to plain JSON requests; the event channel is followed by a
//! background task issuing long-poll requests against the collection's
//! event log.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{DeleteAck, Delivery, PutAck, RemoteStore, Subscription, Versioned};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteEntryResponse, EntryResponse, EventsResponse, PutEntryRequest, PutEntryResponse,
    SizeResponse,
};
use crate::sync::SyncEvent;

/// Default long-poll wait requested from the server.
const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(10);

/// Pause before retrying a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_millis(500);

// == Http Remote ==
/// [`RemoteStore`] backed by the remote store service over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    poll_wait: Duration,
}

impl HttpRemote {
    /// Creates a client for the service at `base_url` (e.g. `http://127.0.0.1:6380`).
    ///
    /// `request_timeout` bounds every non-polling request.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CacheError::Configuration(format!("invalid remote url '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::Configuration(format!(
                "remote url '{}' cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
            poll_wait: DEFAULT_POLL_WAIT,
        })
    }

    /// Overrides how long each event poll asks the server to wait.
    pub fn with_poll_wait(mut self, poll_wait: Duration) -> Self {
        self.poll_wait = poll_wait;
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn entry_url(&self, collection: &str, key: &str) -> Url {
        self.url(&["collections", collection, "entries", key])
    }

    fn events_url(&self, collection: &str) -> Url {
        self.url(&["collections", collection, "events"])
    }

    async fn poll(&self, collection: &str, from: Option<u64>) -> Result<EventsResponse> {
        let mut request = self.client.get(self.events_url(collection));
        let wait_ms = self.poll_wait.as_millis().to_string();
        request = match from {
            Some(from) => request
                .query(&[("from", from.to_string()), ("wait_ms", wait_ms)])
                .timeout(self.poll_wait + self.request_timeout),
            None => request.timeout(self.request_timeout),
        };

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned>> {
        let response = self
            .client
            .get(self.entry_url(collection, key))
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entry: EntryResponse = response.error_for_status()?.json().await?;
        Ok(Some(entry.into()))
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<PutAck> {
        let resp: PutEntryResponse = self
            .client
            .put(self.entry_url(collection, key))
            .timeout(self.request_timeout)
            .json(&PutEntryRequest { value })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(PutAck {
            version: resp.version,
        })
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<DeleteAck> {
        let resp: DeleteEntryResponse = self
            .client
            .delete(self.entry_url(collection, key))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(DeleteAck {
            version: resp.version,
            existed: resp.existed,
        })
    }

    async fn len(&self, collection: &str) -> Result<usize> {
        let resp: SizeResponse = self
            .client
            .get(self.url(&["collections", collection, "size"]))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.size)
    }

    async fn publish(&self, event: SyncEvent) -> Result<()> {
        self.client
            .post(self.events_url(&event.collection))
            .timeout(self.request_timeout)
            .json(&event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        // Fetch the head cursor first so nothing published after this call
        // returns can be missed.
        let mut cursor = self.poll(collection, None).await?.next;
        let (tx, subscription) = Subscription::channel();
        let remote = self.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            debug!("Polling events of '{}' from cursor {}", collection, cursor);
            loop {
                let polled = tokio::select! {
                    _ = tx.closed() => break,
                    polled = remote.poll(&collection, Some(cursor)) => polled,
                };

                let page = match polled {
                    Ok(page) => page,
                    Err(err) => {
                        warn!("Event poll for '{}' failed: {}", collection, err);
                        if !retry_pause(&tx, POLL_RETRY_DELAY).await {
                            break;
                        }
                        continue;
                    }
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
            debug!("Stopped polling events of '{}'", collection);
        });

        Ok(subscription)
    }
}

/// Waits out `delay` unless the subscriber goes away first. Returns false
/// if it did.
async fn retry_pause(tx: &mpsc::Sender<Delivery>, delay: Duration) -> bool {
    tokio::select! {
        _ = tx.closed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
