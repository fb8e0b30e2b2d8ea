//! Identifier validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GatewayError;

static ALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("identifier pattern is valid"));

const MISSING_MESSAGE: &str = "missing 'name' query parameter";
const INVALID_MESSAGE: &str = "Invalid Pokémon name";

/// Knobs for identifier validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationPolicy {
    /// Reject identifiers made only of digits (upstream treats those as ids).
    pub reject_numeric: bool,
}

/// A trimmed identifier that only contains `[a-z0-9-]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a raw query value.
    pub fn parse(raw: Option<&str>, policy: ValidationPolicy) -> Result<Self, GatewayError> {
        let trimmed = raw.map(str::trim).unwrap_or_default();

        if trimmed.is_empty() {
            return Err(GatewayError::InvalidRequest(MISSING_MESSAGE.to_string()));
        }

        if !ALLOWED.is_match(trimmed) {
            return Err(GatewayError::InvalidRequest(INVALID_MESSAGE.to_string()));
        }

        if policy.reject_numeric && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GatewayError::InvalidRequest(INVALID_MESSAGE.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The identifier as a path segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
