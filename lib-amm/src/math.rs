//! Exact integer arithmetic for liquidity accounting and pricing.
//!
//! Products of two 128-bit amounts (and a basis-point factor) do not fit in
//! `u128`, so intermediates are carried in a 256-bit unsigned integer and
//! narrowed back only after the final division. Every division truncates
//! toward zero; callers rely on that rounding direction.

use lib_types::Amount;
use uint::construct_uint;

use crate::errors::{AmmError, AmmResult};

construct_uint! {
    /// 256-bit unsigned integer for overflow-free intermediates.
    pub struct U256(4);
}

/// Narrow a 256-bit value back into an [`Amount`]
pub fn to_amount(value: U256) -> AmmResult<Amount> {
    if value.bits() > 128 {
        return Err(AmmError::Overflow);
    }
    Ok(value.as_u128())
}

/// `floor(a * b / denominator)` without intermediate overflow
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> AmmResult<Amount> {
    if denominator == 0 {
        return Err(AmmError::InvalidAmount("division by zero".to_string()));
    }
    let product = U256::from(a) * U256::from(b);
    to_amount(product / U256::from(denominator))
}

/// Integer square root (Babylonian method), rounded down
///
/// For `y > 3` iterates `x <- (y / x + x) / 2` from `x0 = y / 2 + 1` until the
/// iterate stops decreasing. `0 < y <= 3` yields 1 and `y == 0` yields 0.
pub fn isqrt(y: U256) -> U256 {
    if y > U256::from(3u8) {
        let mut z = y;
        let two = U256::from(2u8);
        let mut x = y / two + U256::one();
        while x < z {
            z = x;
            x = (y / x + x) / two;
        }
        z
    } else if !y.is_zero() {
        U256::one()
    } else {
        U256::zero()
    }
}

/// `floor(sqrt(a * b))`, the geometric mean of two amounts
pub fn geometric_mean(a: Amount, b: Amount) -> AmmResult<Amount> {
    // sqrt of a 256-bit product always fits in 128 bits
    to_amount(isqrt(U256::from(a) * U256::from(b)))
}

/// `reserve0 * reserve1` as a 256-bit value
pub fn product(reserve0: Amount, reserve1: Amount) -> U256 {
    U256::from(reserve0) * U256::from(reserve1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_isqrt_small_values() {
        assert_eq!(isqrt(U256::zero()), U256::zero());
        assert_eq!(isqrt(U256::from(1u8)), U256::one());
        assert_eq!(isqrt(U256::from(2u8)), U256::one());
        assert_eq!(isqrt(U256::from(3u8)), U256::one());
        assert_eq!(isqrt(U256::from(4u8)), U256::from(2u8));
        assert_eq!(isqrt(U256::from(8u8)), U256::from(2u8));
        assert_eq!(isqrt(U256::from(9u8)), U256::from(3u8));
        assert_eq!(isqrt(U256::from(10_000u32)), U256::from(100u32));
    }

    #[test]
    fn test_geometric_mean_bootstrap_example() {
        // 1_000_000 * 4_000_000 = 4e12, sqrt = 2e6
        assert_eq!(geometric_mean(1_000_000, 4_000_000).unwrap(), 2_000_000);
    }

    #[test]
    fn test_geometric_mean_of_max_amounts() {
        assert_eq!(geometric_mean(u128::MAX, u128::MAX).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e30 overflows u128 but the quotient fits
        let e30 = 1_000_000_000_000_000_000_000_000_000_000u128;
        assert_eq!(mul_div(e30, e30, e30).unwrap(), e30);
    }

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div(1, 1, 2).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_rejects_zero_denominator() {
        assert!(matches!(mul_div(1, 1, 0), Err(AmmError::InvalidAmount(_))));
    }

    #[test]
    fn test_mul_div_overflowing_result() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(AmmError::Overflow));
    }

    proptest! {
        #[test]
        fn prop_isqrt_is_floor(y in any::<u128>()) {
            let root = isqrt(U256::from(y));
            let next = root + U256::one();
            prop_assert!(root * root <= U256::from(y));
            prop_assert!(next * next > U256::from(y));
        }

        #[test]
        fn prop_geometric_mean_between_operands(a in 1u128..=u64::MAX as u128, b in 1u128..=u64::MAX as u128) {
            let mean = geometric_mean(a, b).unwrap();
            prop_assert!(mean >= a.min(b));
            prop_assert!(mean <= a.max(b));
        }
    }
}
