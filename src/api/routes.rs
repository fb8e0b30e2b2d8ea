//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    handle_panic, health, method_not_allowed, metrics, not_found, openapi, pokemon_info, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/pokemon-info", get(pokemon_info).fallback(method_not_allowed))
        .route("/openapi.json", get(openapi).fallback(method_not_allowed))
        .route("/metrics", get(metrics).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state);

    with_middleware(router)
}

/// Panic-to-500 conversion and request tracing around a finished router.
pub(crate) fn with_middleware(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}
