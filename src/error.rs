//! Error types.

use thiserror::Error;

/// Errors raised while loading or validating controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The RON source could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A parameter is negative where only non-negative values make sense.
    #[error("`{field}` must be non-negative, got {value}")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A parameter is NaN or infinite.
    #[error("`{field}` must be finite, got {value}")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A parameter lies outside its allowed range.
    #[error("`{field}` must lie within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f32,
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },
}
