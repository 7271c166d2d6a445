//! Response DTOs for the remote store API
//!
//! Shared by the axum handlers that produce them and the `HttpRemote`
//! client that decodes them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::remote::{DeleteAck, EventPage, PutAck, Versioned};
use crate::sync::SyncEvent;

/// Response body for GET /collections/:collection/entries/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: Value,
    pub version: u64,
}

impl EntryResponse {
    pub fn new(key: impl Into<String>, versioned: Versioned) -> Self {
        Self {
            key: key.into(),
            value: versioned.value,
            version: versioned.version,
        }
    }
}

impl From<EntryResponse> for Versioned {
    fn from(resp: EntryResponse) -> Self {
        Versioned {
            value: resp.value,
            version: resp.version,
        }
    }
}

/// Response body for PUT /collections/:collection/entries/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutEntryResponse {
    pub key: String,
    /// Version assigned to the write
    pub version: u64,
}

impl PutEntryResponse {
    pub fn new(key: impl Into<String>, ack: PutAck) -> Self {
        Self {
            key: key.into(),
            version: ack.version,
        }
    }
}

/// Response body for DELETE /collections/:collection/entries/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEntryResponse {
    pub key: String,
    pub version: u64,
    /// Whether the key was present before the delete
    pub existed: bool,
}

impl DeleteEntryResponse {
    pub fn new(key: impl Into<String>, ack: DeleteAck) -> Self {
        Self {
            key: key.into(),
            version: ack.version,
            existed: ack.existed,
        }
    }
}

/// Response body for GET /collections/:collection/size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeResponse {
    pub collection: String,
    pub size: usize,
}

/// Response body for POST /collections/:collection/events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub accepted: bool,
}

/// Response body for GET /collections/:collection/events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Events in publish order
    pub events: Vec<SyncEvent>,
    /// Cursor for the next request
    pub next: u64,
    /// Events trimmed from the log before this reader saw them
    #[serde(default)]
    pub missed: u64,
}

impl From<EventPage> for EventsResponse {
    fn from(page: EventPage) -> Self {
        Self {
            events: page.events,
            next: page.next,
            missed: page.missed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
