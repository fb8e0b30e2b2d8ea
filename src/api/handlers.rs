//! HTTP API handlers.

use std::any::Any;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::{ErrorResponse, GatewayError};
use crate::lookup::{NormalizedResult, PokemonClient};

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upstream client.
    pub client: Arc<PokemonClient>,
    /// Prometheus handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(client: PokemonClient) -> Self {
        Self {
            client: Arc::new(client),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    #[schema(value_type = String)]
    pub status: &'static str,
}

/// Query parameters for `/pokemon-info`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LookupQuery {
    /// Pokemon name (lowercase letters, digits and hyphens).
    pub name: Option<String>,
}

/// OpenAPI document for the public endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(health, pokemon_info),
    components(schemas(HealthResponse, NormalizedResult, ErrorResponse))
)]
pub struct ApiDoc;

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Look up a Pokemon and return the normalized record.
#[utoipa::path(
    get,
    path = "/pokemon-info",
    params(LookupQuery),
    responses(
        (status = 200, description = "Normalized record", body = NormalizedResult),
        (status = 400, description = "Missing or invalid name", body = ErrorResponse),
        (status = 404, description = "Unknown Pokemon", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn pokemon_info(
    State(state): State<AppState>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> Result<Json<NormalizedResult>, GatewayError> {
    let Query(query) =
        query.map_err(|e| GatewayError::InvalidRequest(format!("invalid query string: {}", e)))?;

    let result = state.client.lookup(query.name.as_deref()).await?;
    Ok(Json(result))
}

/// OpenAPI document handler.
pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Prometheus exposition handler; 404 when metrics are disabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => GatewayError::RouteNotFound.into_response(),
    }
}

/// Fallback for a known path with an unsupported method.
pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

/// Fallback for unknown paths.
pub async fn not_found() -> GatewayError {
    GatewayError::RouteNotFound
}

/// Convert a caught panic into a generic 500.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(format!("handler panicked: {}", detail)).into_response()
}
