//! HTTP gateway for PokeAPI lookups.
//!
//! A single endpoint, `GET /pokemon-info?name=<name>`, validates the name,
//! fetches `<base>/<name>` from upstream with bounded linear-backoff retries,
//! and returns a flattened record:
//!
//! ```text
//! {"name": "pikachu", "type": "electric", "height": 4, "weight": 60, "first_ability": "static"}
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`lookup`]: Validation, upstream client, retries, and normalization
//! - [`api`]: HTTP API handlers and routes
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod lookup;
pub mod metrics;
pub mod utils;

pub use config::Config;
pub use error::{AppError, GatewayError, Result};
