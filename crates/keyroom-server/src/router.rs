//! Axum router construction.
//!
//! Assembles the REST and `WebSocket` routes into a single [`Router`]
//! with CORS enabled for any origin, since the browser UI may be served
//! from a different host.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /status` -- minimal HTML status page
/// - `GET /health` -- liveness probe
/// - `GET /api/participants` -- current display names
/// - `GET /ws/{username}` -- session `WebSocket`
///
/// With a static directory configured, every other path is a file from
/// that directory and `/` is its `index.html`. Without one, `/` is the
/// status page.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/status", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/participants", get(handlers::list_participants))
        .route("/ws/{username}", get(ws::ws_session));

    let router = match &state.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(handlers::index)),
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
