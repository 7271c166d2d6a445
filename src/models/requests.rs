//! Request DTOs for the remote store API
//!
//! Structures of incoming HTTP request bodies and query strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for PUT /collections/:collection/entries/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutEntryRequest {
    /// The JSON value to store
    pub value: Value,
}

/// Query string for GET /collections/:collection/events
///
/// # Fields
/// - `from`: cursor to read from; omitted = return the current head only
/// - `wait_ms`: how long to hold the request open when nothing is available
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

/// Validates a collection name or key taken from the path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_name(kind: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return Some(format!("{} cannot be empty", kind));
    }
    if name.len() > 256 {
        return Some(format!("{} exceeds maximum length of 256 characters", kind));
    }
    None
}
