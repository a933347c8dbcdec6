use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::exposition;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/items", get(handlers::items::list_items))
        // ── Metrics ─────────────────────────────────────────────
        .route("/metrics", get(exposition::get_metrics));

    instrument(routes, state)
}

/// Wraps every route of `routes`, including the 404 fallback, with the
/// request metrics middleware and binds the shared state.
///
/// Layers apply bottom-up: a handler panic unwinds through the timing
/// middleware (so nothing is recorded) and is turned into a 500 by
/// `CatchPanicLayer`.
pub fn instrument(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
