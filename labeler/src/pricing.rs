//! Weight and price arithmetic
//!
//! Money is rounded with `rust_decimal` so that values like 6.4675 land on
//! 6.47 rather than whatever the nearest binary float happens to be.

use crate::utils::{AppError, AppResult};
use rust_decimal::prelude::*;
use shared::models::{MAX_PRICE_PER_LB, MAX_WEIGHT};

/// Gross minus tare, never below zero
pub fn net_weight(gross: f64, tare: f64) -> f64 {
    (gross - tare).max(0.0)
}

fn to_decimal(field: &str, value: f64, max: f64) -> AppResult<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    if value > max {
        return Err(AppError::validation(format!(
            "{field} exceeds maximum allowed ({max}), got {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| AppError::validation(format!("{field} is out of range: {value}")))
}

/// `weight * price_per_lb`, rounded half away from zero to cents.
///
/// Inputs outside `0..=MAX_WEIGHT` and `0..=MAX_PRICE_PER_LB` fail with
/// `Validation`.
pub fn total_price(weight: f64, price_per_lb: f64) -> AppResult<f64> {
    let w = to_decimal("weight", weight, MAX_WEIGHT)?;
    let p = to_decimal("price_per_lb", price_per_lb, MAX_PRICE_PER_LB)?;
    let total = w
        .checked_mul(p)
        .ok_or_else(|| AppError::validation(format!("price overflow: {weight} x {price_per_lb}")))?;
    total
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .ok_or_else(|| AppError::internal(format!("price not representable: {total}")))
}
