//! API Routes
//!
//! Configures the Axum router for the remote store service.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_entry_handler, events_handler, get_entry_handler, health_handler, publish_handler,
    put_entry_handler, size_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET|PUT|DELETE /collections/:collection/entries/:key` - versioned entries
/// - `GET /collections/:collection/size` - number of keys
/// - `POST /collections/:collection/events` - publish a sync event
/// - `GET /collections/:collection/events?from=N&wait_ms=M` - long-poll events
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/collections/:collection/entries/:key",
            get(get_entry_handler)
                .put(put_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/collections/:collection/size", get(size_handler))
        .route(
            "/collections/:collection/events",
            post(publish_handler).get(events_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
