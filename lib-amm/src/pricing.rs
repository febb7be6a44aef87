//! Swap Pricing Engine
//!
//! Pure constant-product formulas. Nothing here reads or writes pool state;
//! the drain check against the live reserve and the caller's slippage bounds
//! belong to the pool operations.

use lib_types::{Amount, Bps, BPS_DENOMINATOR};

use crate::errors::{AmmError, AmmResult};
use crate::math::{mul_div, to_amount, U256};

/// Input remaining after the fee, as a fraction of `BPS_DENOMINATOR`
fn fee_factor(fee_bps: Bps) -> AmmResult<U256> {
    let factor = BPS_DENOMINATOR
        .checked_sub(fee_bps)
        .filter(|f| *f > 0)
        .ok_or_else(|| AmmError::InvalidConfig(format!("fee of {} bps leaves no input", fee_bps)))?;
    Ok(U256::from(factor))
}

/// Output for an exact input
///
/// ```text
/// numerator   = amount_in * (10000 - fee_bps) * reserve_out
/// denominator = reserve_in * 10000 + amount_in * (10000 - fee_bps)
/// amount_out  = numerator / denominator
/// ```
///
/// With `fee_bps == 0` this reduces exactly to
/// `amount_in * reserve_out / (reserve_in + amount_in)`.
///
/// # Errors
/// - `InvalidAmount`: zero input or either reserve is zero
pub fn amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: Bps,
) -> AmmResult<Amount> {
    if amount_in == 0 {
        return Err(AmmError::InvalidAmount("input amount cannot be zero".to_string()));
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(AmmError::InvalidAmount("reserves cannot be zero".to_string()));
    }

    let factor = fee_factor(fee_bps)?;
    let amount_in_with_fee = U256::from(amount_in) * factor;

    let numerator = amount_in_with_fee
        .checked_mul(U256::from(reserve_out))
        .ok_or(AmmError::Overflow)?;
    let denominator = U256::from(reserve_in) * U256::from(BPS_DENOMINATOR) + amount_in_with_fee;

    to_amount(numerator / denominator)
}

/// Minimum input that yields at least `amount_out`
///
/// ```text
/// amount_in = reserve_in * amount_out * 10000
///             / ((reserve_out - amount_out) * (10000 - fee_bps)) + 1
/// ```
///
/// # Errors
/// - `InvalidAmount`: zero output or either reserve is zero
/// - `ReserveExhausted`: `amount_out >= reserve_out`
pub fn amount_in(
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: Bps,
) -> AmmResult<Amount> {
    if amount_out == 0 {
        return Err(AmmError::InvalidAmount("output amount cannot be zero".to_string()));
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(AmmError::InvalidAmount("reserves cannot be zero".to_string()));
    }
    if amount_out >= reserve_out {
        return Err(AmmError::ReserveExhausted {
            amount_out,
            reserve: reserve_out,
        });
    }

    let factor = fee_factor(fee_bps)?;
    let numerator = (U256::from(reserve_in) * U256::from(amount_out))
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(AmmError::Overflow)?;
    let denominator = U256::from(reserve_out - amount_out) * factor;

    let amount = to_amount(numerator / denominator)?;
    amount.checked_add(1).ok_or(AmmError::Overflow)
}

/// Fee-free preview of a swap output, for external callers
pub fn quote_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> AmmResult<Amount> {
    amount_out(amount_in, reserve_in, reserve_out, 0)
}

/// Amount of B equivalent to `amount_a` at the current reserve ratio
///
/// # Errors
/// - `InvalidAmount`: zero amount or either reserve is zero
pub fn quote(amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> AmmResult<Amount> {
    if amount_a == 0 {
        return Err(AmmError::InvalidAmount("quote amount cannot be zero".to_string()));
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(AmmError::InvalidAmount("reserves cannot be zero".to_string()));
    }
    mul_div(amount_a, reserve_b, reserve_a)
}

/// Price of A in units of B, scaled by `scale`
///
/// # Errors
/// - `EmptyPool`: either reserve is zero
pub fn spot_price(reserve_a: Amount, reserve_b: Amount, scale: Amount) -> AmmResult<Amount> {
    if reserve_a == 0 || reserve_b == 0 {
        return Err(AmmError::EmptyPool);
    }
    mul_div(reserve_b, scale, reserve_a)
}
