//! API Handlers
//!
//! HTTP request handlers exposing a [`MemoryRemote`] as the shared remote
//! store: versioned entries per collection plus a long-polled event log.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_name, DeleteEntryResponse, EntryResponse, EventsQuery, EventsResponse,
    HealthResponse, PublishResponse, PutEntryRequest, PutEntryResponse, SizeResponse,
};
use crate::remote::{MemoryRemote, RemoteStore};
use crate::sync::SyncEvent;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authoritative store for every collection
    pub remote: Arc<MemoryRemote>,
    /// Upper bound on how long an events request is held open
    pub long_poll: Duration,
}

impl AppState {
    /// Creates a new AppState around an existing store.
    pub fn new(remote: Arc<MemoryRemote>, long_poll: Duration) -> Self {
        Self { remote, long_poll }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            Arc::new(MemoryRemote::new(config.event_log_capacity)),
            Duration::from_millis(config.long_poll_ms),
        )
    }
}

fn validate_path(collection: &str, key: Option<&str>) -> Result<()> {
    if let Some(msg) = validate_name("Collection", collection) {
        return Err(CacheError::InvalidRequest(msg));
    }
    if let Some(msg) = key.and_then(|key| validate_name("Key", key)) {
        return Err(CacheError::InvalidRequest(msg));
    }
    Ok(())
}

/// Handler for GET /collections/:collection/entries/:key
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Json<EntryResponse>> {
    validate_path(&collection, Some(key.as_str()))?;

    match state.remote.get(&collection, &key).await? {
        Some(versioned) => Ok(Json(EntryResponse::new(key, versioned))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /collections/:collection/entries/:key
pub async fn put_entry_handler(
    State(state): State<AppState>,
    Path((collection, key)): Path<(String, String)>,
    Json(req): Json<PutEntryRequest>,
) -> Result<Json<PutEntryResponse>> {
    validate_path(&collection, Some(key.as_str()))?;

    let ack = state.remote.put(&collection, &key, req.value).await?;
    debug!("PUT {}/{} -> version {}", collection, key, ack.version);

    Ok(Json(PutEntryResponse::new(key, ack)))
}

/// Handler for DELETE /collections/:collection/entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Json<DeleteEntryResponse>> {
    validate_path(&collection, Some(key.as_str()))?;

    let ack = state.remote.delete(&collection, &key).await?;
    Ok(Json(DeleteEntryResponse::new(key, ack)))
}

/// Handler for GET /collections/:collection/size
pub async fn size_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<SizeResponse>> {
    validate_path(&collection, None)?;

    let size = state.remote.len(&collection).await?;
    Ok(Json(SizeResponse { collection, size }))
}

/// Handler for POST /collections/:collection/events
///
/// The event must name the collection it is posted to.
pub async fn publish_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(event): Json<SyncEvent>,
) -> Result<(StatusCode, Json<PublishResponse>)> {
    validate_path(&collection, Some(event.key.as_str()))?;
    if event.collection != collection {
        return Err(CacheError::InvalidRequest(format!(
            "event for collection '{}' posted to '{}'",
            event.collection, collection
        )));
    }

    state.remote.publish(event).await?;
    Ok((StatusCode::ACCEPTED, Json(PublishResponse { accepted: true })))
}

/// Handler for GET /collections/:collection/events
///
/// Without `from`, answers immediately with the current head cursor.
/// With `from`, holds the request open until an event arrives or the wait
/// (capped by the server's long-poll limit) runs out.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>> {
    validate_path(&collection, None)?;

    let wait = query
        .wait_ms
        .map(Duration::from_millis)
        .unwrap_or(state.long_poll)
        .min(state.long_poll);
    let page = state
        .remote
        .wait_for_events(&collection, query.from, wait)
        .await;

    Ok(Json(page.into()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
