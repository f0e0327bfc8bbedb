//! # HTTP Surface
//!
//! axum router over the health checker. All responses are JSON; request
//! logging rides the tower-http trace layer.

pub mod handlers;
pub mod response_types;
pub mod state;

pub use response_types::{ApiError, ApiResult};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Assemble the health-check router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::primary_health))
        .route("/primary", get(handlers::health::primary_health))
        .route("/replica", get(handlers::health::replica_health))
        .route("/slot/:slot_name", get(handlers::health::slot_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
