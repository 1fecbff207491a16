//! scalebridge-api — HTTP event submission.
//!
//! A single route accepts activation updates as query parameters and
//! applies them synchronously to the status store.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | any | `/?name=&active=&value=` | Submit an update event (`name` empty → global default) |

pub mod handlers;

use axum::Router;
use axum::routing::any;
use scalebridge_registry::EventIngestor;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub ingestor: EventIngestor,
}

/// Build the API router.
pub fn build_router(ingestor: EventIngestor) -> Router {
    Router::new()
        .route("/", any(handlers::submit_event))
        .with_state(ApiState { ingestor })
}
