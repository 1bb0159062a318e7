//! Checked fixed-point arithmetic
//!
//! Products of two 128-bit amounts are computed in 256 bits and truncated
//! toward zero, so `mul_div` never loses precision to an intermediate overflow.

use primitive_types::U256;

use crate::error::{DaoError, Result};
use crate::types::Amount;

/// Denominator for basis-point fractions (100%)
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Fixed-point scale of the reward-per-token accumulator
pub const PRECISION: Amount = 1_000_000_000_000_000_000;

/// `a * b / denominator`, rounded down
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Result<Amount> {
    if denominator == 0 {
        return Err(DaoError::InvalidParameter("division by zero".to_string()));
    }
    let result = U256::from(a) * U256::from(b) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(DaoError::Overflow);
    }
    Ok(result.low_u128())
}

/// `amount * bps / 10_000`, rounded down
pub fn apply_bps(amount: Amount, bps: u16) -> Result<Amount> {
    mul_div(amount, Amount::from(bps), Amount::from(BPS_DENOMINATOR))
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(DaoError::Overflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(DaoError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNIT;

    #[test]
    fn test_apply_bps_rounds_down() {
        assert_eq!(apply_bps(1000, 500).unwrap(), 50);
        assert_eq!(apply_bps(1, 500).unwrap(), 0);
        assert_eq!(apply_bps(999, 2500).unwrap(), 249);
        assert_eq!(apply_bps(1000, 0).unwrap(), 0);
        assert_eq!(apply_bps(1000, BPS_DENOMINATOR).unwrap(), 1000);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e24 * 1e18 overflows u128 but the quotient fits
        let staked = 1_000_000 * UNIT;
        let rpt = mul_div(1000 * UNIT, PRECISION, staked).unwrap();
        assert_eq!(rpt, PRECISION / 1000);
        assert_eq!(mul_div(staked, rpt, PRECISION).unwrap(), 1000 * UNIT);
    }

    #[test]
    fn test_mul_div_overflow_and_zero_denominator() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(DaoError::Overflow));
        assert!(matches!(
            mul_div(1, 1, 0),
            Err(DaoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(checked_add(1, 2).unwrap(), 3);
        assert_eq!(checked_add(u128::MAX, 1), Err(DaoError::Overflow));
        assert_eq!(checked_sub(1, 2), Err(DaoError::Overflow));
    }
}
