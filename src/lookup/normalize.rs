//! Projection of the upstream payload into the gateway's response schema.
//!
//! Scalar fields fall back to `null` when absent or of an unexpected type.
//! List fields (`types`, `abilities`) are also `null` when absent or empty, but
//! a non-empty list whose first entry lacks the expected nesting is a
//! [`ShapeError`].

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use utoipa::ToSchema;

/// Simplified Pokemon record returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NormalizedResult {
    /// Pokemon name.
    pub name: Option<String>,
    /// Name of the first listed type.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Height as reported upstream (decimetres).
    #[schema(value_type = Option<f64>)]
    pub height: Option<Number>,
    /// Weight as reported upstream (hectograms).
    #[schema(value_type = Option<f64>)]
    pub weight: Option<Number>,
    /// Name of the first listed ability.
    pub first_ability: Option<String>,
}

/// The upstream body does not have the structure we project from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Body was not valid JSON.
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Top-level value was not an object.
    #[error("body is not a JSON object")]
    NotAnObject,

    /// `field` is present and non-empty but not a list.
    #[error("`{field}` is not a list")]
    NotAList {
        /// Offending field.
        field: &'static str,
    },

    /// An element or nested value is missing or of the wrong type.
    #[error("`{path}` is missing or malformed")]
    Malformed {
        /// Path of the offending value, e.g. `abilities[0].ability`.
        path: String,
    },
}

/// Parse a raw upstream body and project it.
pub fn normalize_bytes(body: &[u8]) -> Result<NormalizedResult, ShapeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;
    normalize(&value)
}

/// Project an upstream JSON document.
pub fn normalize(body: &Value) -> Result<NormalizedResult, ShapeError> {
    let object = body.as_object().ok_or(ShapeError::NotAnObject)?;

    Ok(NormalizedResult {
        name: object.get("name").and_then(Value::as_str).map(str::to_string),
        kind: first_nested_name(object, "types", "type")?,
        height: number_field(object, "height"),
        weight: number_field(object, "weight"),
        first_ability: first_nested_name(object, "abilities", "ability")?,
    })
}

fn number_field(object: &Map<String, Value>, field: &str) -> Option<Number> {
    match object.get(field) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

/// `object[list][0][inner].name`, treating an absent or empty list as `None`.
fn first_nested_name(
    object: &Map<String, Value>,
    list: &'static str,
    inner: &'static str,
) -> Result<Option<String>, ShapeError> {
    let value = match object.get(list) {
        Some(value) if !is_empty(value) => value,
        _ => return Ok(None),
    };

    let items = value.as_array().ok_or(ShapeError::NotAList { field: list })?;
    // Non-empty is guaranteed by `is_empty` above.
    let first = &items[0];

    let nested = first
        .get(inner)
        .and_then(Value::as_object)
        .ok_or_else(|| ShapeError::Malformed {
            path: format!("{list}[0].{inner}"),
        })?;

    match nested.get("name") {
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(Value::Null) => Ok(None),
        _ => Err(ShapeError::Malformed {
            path: format!("{list}[0].{inner}.name"),
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
