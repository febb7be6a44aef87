//! Liquidity Accounting
//!
//! Minting and withdrawal rules for liquidity units.
//!
//! - **Bootstrap** (`total_liquidity == 0`): `floor(sqrt(amount0 * amount1))`,
//!   minus an optional permanently locked minimum.
//! - **Subsequent**: `min(amount0 * total / reserve0, amount1 * total / reserve1)`,
//!   so a contributor is credited for the side they under-supplied.
//! - **Withdrawal**: `units * reserve / total` per side.
//!
//! All divisions truncate, so contributors are never over-credited and
//! withdrawers never take more than their exact share.

use lib_types::Amount;
use serde::{Deserialize, Serialize};

use crate::errors::{AmmError, AmmResult};
use crate::math::{geometric_mean, mul_div};
use crate::pool::Pool;
use crate::pricing::quote;

/// Units created by a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minted {
    /// Units credited to the depositor's recipient
    pub units: Amount,
    /// Units locked to the null holder (bootstrap only)
    pub locked: Amount,
}

/// Compute the units minted for depositing canonical `amounts` into `pool`
///
/// # Errors
/// - `MinimumLiquidity`: bootstrap result does not exceed the locked minimum
/// - `ZeroLiquidityMinted`: the deposit rounds down to zero units
pub fn mint_units(
    pool: &Pool,
    amounts: [Amount; 2],
    minimum_liquidity: Amount,
) -> AmmResult<Minted> {
    if pool.is_empty() {
        let root = geometric_mean(amounts[0], amounts[1])?;

        if minimum_liquidity > 0 {
            if root <= minimum_liquidity {
                return Err(AmmError::MinimumLiquidity {
                    minted: root,
                    minimum: minimum_liquidity,
                });
            }
            return Ok(Minted {
                units: root - minimum_liquidity,
                locked: minimum_liquidity,
            });
        }

        if root == 0 {
            return Err(AmmError::ZeroLiquidityMinted);
        }
        return Ok(Minted { units: root, locked: 0 });
    }

    let [reserve0, reserve1] = pool.reserves;
    if reserve0 == 0 || reserve1 == 0 {
        return Err(AmmError::InvariantViolation(format!(
            "liquidity {} outstanding against reserves {:?}",
            pool.total_liquidity, pool.reserves
        )));
    }

    let share0 = mul_div(amounts[0], pool.total_liquidity, reserve0)?;
    let share1 = mul_div(amounts[1], pool.total_liquidity, reserve1)?;
    let units = share0.min(share1);

    if units == 0 {
        return Err(AmmError::ZeroLiquidityMinted);
    }
    Ok(Minted { units, locked: 0 })
}

/// Canonical amounts returned for burning `units`
///
/// # Errors
/// - `EmptyPool`: nothing has been issued
/// - `InsufficientLiquidity`: more units than exist
pub fn withdrawal_amounts(pool: &Pool, units: Amount) -> AmmResult<[Amount; 2]> {
    if pool.is_empty() {
        return Err(AmmError::EmptyPool);
    }
    if units > pool.total_liquidity {
        return Err(AmmError::InsufficientLiquidity {
            have: pool.total_liquidity,
            need: units,
        });
    }

    Ok([
        mul_div(units, pool.reserves[0], pool.total_liquidity)?,
        mul_div(units, pool.reserves[1], pool.total_liquidity)?,
    ])
}

/// Pick the deposit that matches the current reserve ratio
///
/// All values are in the caller's (a, b) order. Tries to use all of
/// `desired_a`; if the matching B exceeds `desired_b`, uses all of
/// `desired_b` instead.
///
/// # Errors
/// - `SlippageB`: the matching B is below `min_b`
/// - `SlippageA`: the matching A is below `min_a`
pub fn optimal_amounts(
    desired: (Amount, Amount),
    minimum: (Amount, Amount),
    reserves: (Amount, Amount),
) -> AmmResult<(Amount, Amount)> {
    let (desired_a, desired_b) = desired;
    let (min_a, min_b) = minimum;
    let (reserve_a, reserve_b) = reserves;

    let optimal_b = quote(desired_a, reserve_a, reserve_b)?;
    if optimal_b <= desired_b {
        if optimal_b < min_b {
            return Err(AmmError::SlippageB {
                actual: optimal_b,
                minimum: min_b,
            });
        }
        return Ok((desired_a, optimal_b));
    }

    let optimal_a = quote(desired_b, reserve_b, reserve_a)?;
    // optimal_a <= desired_a follows from optimal_b > desired_b
    if optimal_a < min_a {
        return Err(AmmError::SlippageA {
            actual: optimal_a,
            minimum: min_a,
        });
    }
    Ok((optimal_a, desired_b))
}
