//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64`; every calculation goes
//! through `Decimal` and is rounded back to 2 decimal places.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    let rounded = value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_f64().unwrap_or_else(|| {
        tracing::error!(value = %rounded, "Decimal not representable as f64, defaulting to zero");
        0.0
    })
}

/// Round an f64 amount to 2 decimal places
#[inline]
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// `price * quantity` as Decimal
#[inline]
pub fn line_total(price: f64, quantity: i64) -> Decimal {
    to_decimal(price) * Decimal::from(quantity)
}

/// `amount * percent / 100`
#[inline]
pub fn percent_of(amount: Decimal, percent: f64) -> Decimal {
    amount * to_decimal(percent) / Decimal::ONE_HUNDRED
}

/// Clamp into `[0, upper]`
#[inline]
pub fn clamp_discount(discount: Decimal, upper: Decimal) -> Decimal {
    discount.max(Decimal::ZERO).min(upper.max(Decimal::ZERO))
}
