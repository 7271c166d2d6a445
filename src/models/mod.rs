//! Request and Response models for the remote store API
//!
//! DTOs serialized by the axum service and decoded by the HTTP client.

pub mod requests;
pub mod responses;

pub use requests::{validate_name, EventsQuery, PutEntryRequest};
pub use responses::{
    DeleteEntryResponse, EntryResponse, EventsResponse, HealthResponse, PublishResponse,
    PutEntryResponse, SizeResponse,
};
