//! Sync events exchanged between handles of one collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of one handle, stamped on every event it publishes.
pub type HandleId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    /// The key has a new value, shipped in the payload
    Update,
    /// The key changed or was deleted; peers must drop their copy
    Invalidate,
}

/// A mutation announced on a collection's event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub collection: String,
    pub key: String,
    pub kind: SyncEventKind,
    /// JSON-encoded value, present only for `Update`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Handle that made the mutation
    pub origin: HandleId,
    /// Remote version assigned to the mutation
    pub sequence: u64,
    pub published_at: DateTime<Utc>,
}

impl SyncEvent {
    pub fn update(
        collection: impl Into<String>,
        key: impl Into<String>,
        payload: Value,
        origin: HandleId,
        sequence: u64,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
            kind: SyncEventKind::Update,
            payload: Some(payload),
            origin,
            sequence,
            published_at: Utc::now(),
        }
    }

    pub fn invalidate(
        collection: impl Into<String>,
        key: impl Into<String>,
        origin: HandleId,
        sequence: u64,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
            kind: SyncEventKind::Invalidate,
            payload: None,
            origin,
            sequence,
            published_at: Utc::now(),
        }
    }
}
