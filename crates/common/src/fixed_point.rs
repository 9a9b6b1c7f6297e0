//! WAD fixed-point arithmetic.
//!
//! All protocol-level ratios (share prices, profit ratios, power fractions,
//! benchmark segments) are carried as u128 scaled by 1e18. Every operation
//! is checked; callers propagate `MathError` instead of wrapping silently.

use thiserror::Error;

/// Fixed-point scale: 1.0 == 1e18.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator (100% == 10_000 bps).
pub const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("math overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Multiply two WAD values: (a * b) / WAD.
pub fn wad_mul(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_mul(b)
        .ok_or(MathError::Overflow)
        .map(|v| v / WAD)
}

/// Divide two WAD values: (a * WAD) / b.
pub fn wad_div(a: u128, b: u128) -> Result<u128, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    a.checked_mul(WAD).ok_or(MathError::Overflow).map(|v| v / b)
}

/// Multiply a value by basis points: (value * bps) / 10_000.
pub fn bps_mul(value: u128, bps: u128) -> Result<u128, MathError> {
    value
        .checked_mul(bps)
        .ok_or(MathError::Overflow)
        .map(|v| v / BPS_DENOMINATOR)
}

/// Generic checked proportion: (value * numerator) / denominator.
pub fn proportion(value: u128, numerator: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    value
        .checked_mul(numerator)
        .ok_or(MathError::Overflow)
        .map(|v| v / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wad_mul_identity() {
        assert_eq!(wad_mul(5 * WAD, WAD).unwrap(), 5 * WAD);
        assert_eq!(wad_mul(0, WAD).unwrap(), 0);
    }

    #[test]
    fn wad_div_inverse() {
        // 10 / 4 = 2.5
        assert_eq!(wad_div(10 * WAD, 4 * WAD).unwrap(), 2_500_000_000_000_000_000);
    }

    #[test]
    fn wad_div_zero_rejected() {
        assert_eq!(wad_div(WAD, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn bps_mul_exact() {
        // 2.5% of 10_000 = 250
        assert_eq!(bps_mul(10_000, 250).unwrap(), 250);
        // 100% is identity
        assert_eq!(bps_mul(777, 10_000).unwrap(), 777);
    }

    #[test]
    fn proportion_rounds_down() {
        // 10 * 1 / 3 = 3 (floor)
        assert_eq!(proportion(10, 1, 3).unwrap(), 3);
        assert_eq!(proportion(10, 0, 3).unwrap(), 0);
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(wad_mul(u128::MAX, 2), Err(MathError::Overflow));
        assert_eq!(proportion(u128::MAX, 2, 1), Err(MathError::Overflow));
    }
}
