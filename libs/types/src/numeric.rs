//! Fixed-point decimal helpers for pool amounts and shares
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Quantities are kept at a fixed number of decimal places so that adding and
//! subtracting them is exact; only multiplication and division round, and the
//! `_floor`/`_ceil` helpers let the caller pick the direction.
//!
//! Every helper is checked: overflow and division by zero come back as `None`
//! so callers can turn them into typed errors before touching state.

use rust_decimal::{Decimal, RoundingStrategy};

/// Quantity of an asset (primary or reward).
pub type Amount = Decimal;

/// Quantity of pool shares.
pub type Shares = Decimal;

/// Default number of decimal places for amounts and shares.
pub const DEFAULT_PRECISION: u32 = 18;

/// Largest scale rust_decimal can represent.
pub const MAX_PRECISION: u32 = 28;

/// `value * numerator / denominator`, multiplying first.
///
/// Multiplying before dividing keeps a single rounding step for the common
/// case. If the product overflows the 96-bit mantissa the ratio is taken
/// first instead. Returns `None` for a zero denominator or when both
/// orderings overflow.
pub fn mul_div(value: Decimal, numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    match value.checked_mul(numerator) {
        Some(product) => product.checked_div(denominator),
        None => numerator.checked_div(denominator)?.checked_mul(value),
    }
}

/// `mul_div` rounded down to `dp` decimal places.
pub fn mul_div_floor(
    value: Decimal,
    numerator: Decimal,
    denominator: Decimal,
    dp: u32,
) -> Option<Decimal> {
    mul_div(value, numerator, denominator)
        .map(|v| v.round_dp_with_strategy(dp, RoundingStrategy::ToNegativeInfinity))
}

/// `mul_div` rounded up to `dp` decimal places.
pub fn mul_div_ceil(
    value: Decimal,
    numerator: Decimal,
    denominator: Decimal,
    dp: u32,
) -> Option<Decimal> {
    mul_div(value, numerator, denominator)
        .map(|v| v.round_dp_with_strategy(dp, RoundingStrategy::ToPositiveInfinity))
}

/// True when `amount` has no significant digits beyond `dp` decimal places.
pub fn fits_precision(amount: Decimal, dp: u32) -> bool {
    amount.normalize().scale() <= dp
}

/// Magnitude below which values at `dp` decimal places, and the sum or
/// difference of two such values, are held exactly: `10^(28 - dp)`.
pub fn exact_bound(dp: u32) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(10i128.pow(MAX_PRECISION), dp).ok()
}

/// `a + b` at `dp` decimal places, or `None` if any operand or the result
/// reaches `exact_bound(dp)` and could be rounded.
pub fn exact_sum(a: Decimal, b: Decimal, dp: u32) -> Option<Decimal> {
    exact(a.checked_add(b), a, b, dp)
}

/// `a - b` at `dp` decimal places, with the same bound as `exact_sum`.
pub fn exact_diff(a: Decimal, b: Decimal, dp: u32) -> Option<Decimal> {
    exact(a.checked_sub(b), a, b, dp)
}

fn exact(result: Option<Decimal>, a: Decimal, b: Decimal, dp: u32) -> Option<Decimal> {
    let bound = exact_bound(dp)?;
    if a.abs() >= bound || b.abs() >= bound {
        return None;
    }
    result.filter(|r| r.abs() < bound)
}

/// Checked `a + b`.
pub fn checked_sum(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_add(b)
}

/// Checked `a - b`.
pub fn checked_diff(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_sub(b)
}

/// True when `a` and `b` differ by at most `tolerance`.
pub fn approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    match a.checked_sub(b) {
        Some(diff) => diff.abs() <= tolerance,
        None => false,
    }
}
