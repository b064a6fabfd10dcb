use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, queries, snapshot};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Queries
        .route("/endpoints", get(queries::list_endpoints))
        .route("/endpoints/{endpoint}/listing", get(queries::get_listing))
        .route("/endpoints/{endpoint}/visited", post(queries::mark_visited))
        .route(
            "/endpoints/{endpoint}/visited/batch",
            post(queries::mark_visited_batch),
        )
        // Persistence
        .route("/snapshot", post(snapshot::trigger_snapshot));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
