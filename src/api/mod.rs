//! API Module
//!
//! HTTP handlers and routing for the remote store service.
//!
//! # Endpoints
//! - `GET|PUT|DELETE /collections/:collection/entries/:key`
//! - `GET /collections/:collection/size`
//! - `POST /collections/:collection/events`
//! - `GET /collections/:collection/events`
//! - `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
