//! Pokemon lookup: validation, upstream calls with retries, and normalization.

pub mod client;
pub mod identifier;
pub mod normalize;
pub mod retry;

pub use client::{AttemptOutcome, PokemonClient};
pub use identifier::{Identifier, ValidationPolicy};
pub use normalize::{normalize, NormalizedResult, ShapeError};
pub use retry::RetryPolicy;
