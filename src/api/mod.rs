//! HTTP surface: route wiring, request validation, and the explicit
//! validate -> rate-limit -> cache-lookup -> handle -> cache-store
//! middleware chain (§4.7 / §9 — replaces the source's decorator-driven
//! routing with ordered `axum::middleware::from_fn_with_state` layers).

mod handlers;
mod middleware;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let detect_routes = Router::new()
        .route("/detect/hash/by-node", post(handlers::detect_by_node))
        .route("/detect/hash/by-metadata", post(handlers::detect_by_metadata))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cache_lookup,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::validate_request));

    let admin_routes = Router::new().route("/admin/cache/clear", post(handlers::admin_cache_clear));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(detect_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
