//! Unified error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::lookup::normalize::ShapeError;

/// Errors that can stop the service from starting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failures, each mapped to a status code and a JSON body.
///
/// `Display` carries the detail logged server-side. Callers only ever see
/// [`GatewayError::public_message`].
#[derive(Error, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum GatewayError {
    /// The identifier is missing or not allowed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered 404.
    #[error("pokemon not found upstream")]
    NotFound,

    /// Upstream answered 200 with a body we cannot project.
    #[error("upstream returned unexpected data: {0}")]
    UpstreamShape(#[from] ShapeError),

    /// Every attempt failed with a transient error.
    #[error("upstream unavailable after {attempts} attempts: {last_failure}")]
    UpstreamUnavailable {
        /// Attempts made.
        attempts: u32,
        /// Description of the final failure.
        last_failure: String,
    },

    /// Upstream answered with a status outside 200/404/5xx.
    #[error("upstream answered with status {status}")]
    UpstreamUnexpected {
        /// Status returned by the upstream.
        status: u16,
    },

    /// Route exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// No route matches the path.
    #[error("route not found")]
    RouteNotFound,

    /// Unhandled fault while processing the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::UpstreamShape(_)
            | Self::UpstreamUnavailable { .. }
            | Self::UpstreamUnexpected { .. } => StatusCode::BAD_GATEWAY,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(message) => message.clone(),
            Self::NotFound => "Pokemon not found".to_string(),
            Self::UpstreamShape(_) => "upstream returned unexpected data".to_string(),
            Self::UpstreamUnavailable { .. } => "upstream service unavailable".to_string(),
            Self::UpstreamUnexpected { .. } => "upstream error".to_string(),
            Self::MethodNotAllowed => "method not allowed".to_string(),
            Self::RouteNotFound => "not found".to_string(),
            Self::Internal(_) => "internal server error".to_string(),
        }
    }

    /// Snake-case variant name, used as a metrics label.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// JSON error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(_) = &self {
            error!("{}", self);
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Convenient Result type alias for startup paths.
pub type Result<T> = std::result::Result<T, AppError>;
