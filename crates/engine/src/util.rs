//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation logic so every write path enforces the same invariants.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Generate a fresh opaque identifier for a stored row.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trim a user supplied name and reject it when nothing is left.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// A rate converts one foreign unit into native units, so it must be a
/// finite number strictly greater than zero.
pub(crate) fn validate_rate(symbol: &str, rate: f64) -> ResultEngine<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(EngineError::InvalidRate(format!(
            "rate for currency '{symbol}' must be > 0, got {rate}"
        )));
    }
    Ok(())
}

/// Prices are expressed in the item's currency and can't be negative.
pub(crate) fn validate_price(item_name: &str, price: f64) -> ResultEngine<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(EngineError::InvalidAmount(format!(
            "price for item '{item_name}' must be >= 0, got {price}"
        )));
    }
    Ok(())
}

/// Largest cost of a single item, in native units.
///
/// Keeps every floored share and payment exact in `f64` and far from the
/// `i64` limits of the result.
pub const MAX_NATIVE_TOTAL: f64 = 1e15;

/// `price * rate * quantity` must stay within [`MAX_NATIVE_TOTAL`].
pub(crate) fn validate_native_total(
    item_name: &str,
    price: f64,
    rate: f64,
    quantity: u32,
) -> ResultEngine<()> {
    let total = price * rate * f64::from(quantity);
    if !total.is_finite() || total > MAX_NATIVE_TOTAL {
        return Err(EngineError::InvalidAmount(format!(
            "cost of item '{item_name}' must be <= {MAX_NATIVE_TOTAL} native units, got {total}"
        )));
    }
    Ok(())
}

/// Stored quantities are `i64`; the domain uses `u32`.
pub(crate) fn model_quantity(item_id: &str, quantity: i64) -> ResultEngine<u32> {
    u32::try_from(quantity).map_err(|_| {
        EngineError::InvalidAmount(format!(
            "invalid quantity {quantity} for item '{item_id}'"
        ))
    })
}
