use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{catalog, handlers, middleware::metrics_middleware, optimize};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Optimizer
        .route("/optimize", post(optimize::optimize))
        .route("/savings", post(optimize::estimate_savings))
        .route("/optimizer/cache", delete(optimize::invalidate_cache))
        // Catalog
        .route("/clubs", get(catalog::list_clubs))
        .route("/competitions", get(catalog::list_competitions))
        .route("/providers", get(catalog::list_providers))
        .route("/catalog/import", post(catalog::import_catalog))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
