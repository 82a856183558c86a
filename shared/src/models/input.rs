//! Parsing of free-text UI fields into typed values

use thiserror::Error;

/// Largest weight (lb) accepted from the weight entry or as a tare
pub const MAX_WEIGHT: f64 = 100_000.0;

/// Largest price per pound accepted for a product
pub const MAX_PRICE_PER_LB: f64 = 1_000_000.0;

/// Errors raised while turning operator input into typed values
#[derive(Debug, Error)]
pub enum InputError {
    /// A numeric field held something that is not a number
    #[error("{field}: '{value}' is not a number")]
    InvalidNumber { field: String, value: String },

    /// A numeric field was negative where only non-negative values make sense
    #[error("{field}: {value} must not be negative")]
    Negative { field: String, value: f64 },

    /// A numeric field exceeded its upper bound
    #[error("{field}: {value} exceeds maximum allowed ({max})")]
    TooLarge { field: String, value: f64, max: f64 },

    /// Struct-level validation failed
    #[error("{0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Parse a numeric entry field.
///
/// Blank input yields `default`, mirroring an untouched entry box.
pub fn parse_number(field: &str, raw: &str, default: f64) -> Result<f64, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(InputError::InvalidNumber {
            field: field.to_string(),
            value: trimmed.to_string(),
        }),
    }
}

/// Parse the weight entry (pounds). Blank means zero.
///
/// Negative weights and weights above [`MAX_WEIGHT`] are rejected.
pub fn parse_weight(raw: &str) -> Result<f64, InputError> {
    let weight = parse_number("weight", raw, 0.0)?;
    if weight < 0.0 {
        return Err(InputError::Negative {
            field: "weight".to_string(),
            value: weight,
        });
    }
    if weight > MAX_WEIGHT {
        return Err(InputError::TooLarge {
            field: "weight".to_string(),
            value: weight,
            max: MAX_WEIGHT,
        });
    }
    Ok(weight)
}
