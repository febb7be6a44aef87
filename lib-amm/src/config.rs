//! Ledger Configuration
//!
//! Policy parameters that the historical contract variants disagreed on:
//! whether a swap fee applies, whether deadlines are enforced and whether
//! a minimum amount of liquidity is locked on bootstrap.

use lib_types::{Amount, Bps, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::errors::{AmmError, AmmResult};
use crate::{DEFAULT_FEE_BPS, MAX_FEE_BPS, MINIMUM_LIQUIDITY, PRICE_SCALE};

/// Configuration for pool operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmmConfig {
    // =========================================================================
    // Pricing
    // =========================================================================
    /// Swap fee in basis points, taken from the input amount (30 = 0.3%)
    pub fee_bps: Bps,
    /// Upper bound for `fee_bps`
    pub max_fee_bps: Bps,
    /// Fixed-point scale for spot prices
    pub price_scale: Amount,

    // =========================================================================
    // Guards
    // =========================================================================
    /// Reject operations whose deadline is before the current time
    pub enforce_deadline: bool,
    /// Units permanently locked to the null holder on bootstrap (0 = none)
    pub minimum_liquidity: Amount,
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            max_fee_bps: MAX_FEE_BPS,
            price_scale: PRICE_SCALE,
            enforce_deadline: true,
            minimum_liquidity: MINIMUM_LIQUIDITY,
        }
    }
}

impl AmmConfig {
    /// The 0.3% fee / 1000-unit lock / deadline-enforcing policy
    pub fn uniswap_v2() -> Self {
        Self::default()
    }

    /// Create a permissive config for testing: no fee, no deadline, no lock
    pub fn for_testing() -> Self {
        Self {
            fee_bps: 0,
            max_fee_bps: MAX_FEE_BPS,
            price_scale: PRICE_SCALE,
            enforce_deadline: false,
            minimum_liquidity: 0,
        }
    }

    /// Builder-style fee override
    pub fn with_fee_bps(mut self, fee_bps: Bps) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    /// Builder-style minimum liquidity override
    pub fn with_minimum_liquidity(mut self, minimum_liquidity: Amount) -> Self {
        self.minimum_liquidity = minimum_liquidity;
        self
    }

    /// Builder-style deadline enforcement override
    pub fn with_deadline_enforced(mut self, enforce: bool) -> Self {
        self.enforce_deadline = enforce;
        self
    }

    /// Check the configuration is internally consistent
    pub fn validate(&self) -> AmmResult<()> {
        if self.max_fee_bps >= BPS_DENOMINATOR {
            return Err(AmmError::InvalidConfig(format!(
                "max_fee_bps must be below {}, got {}",
                BPS_DENOMINATOR, self.max_fee_bps
            )));
        }
        if self.fee_bps > self.max_fee_bps {
            return Err(AmmError::InvalidConfig(format!(
                "fee_bps {} exceeds max_fee_bps {}",
                self.fee_bps, self.max_fee_bps
            )));
        }
        if self.price_scale == 0 {
            return Err(AmmError::InvalidConfig("price_scale cannot be zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AmmConfig::default();
        assert_eq!(config.fee_bps, 30);
        assert_eq!(config.minimum_liquidity, 1000);
        assert!(config.enforce_deadline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_testing_is_permissive() {
        let config = AmmConfig::for_testing();
        assert_eq!(config.fee_bps, 0);
        assert_eq!(config.minimum_liquidity, 0);
        assert!(!config.enforce_deadline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_fee_above_max() {
        let config = AmmConfig::default().with_fee_bps(1001);
        assert!(matches!(config.validate(), Err(AmmError::InvalidConfig(_))));

        let config = AmmConfig::default().with_fee_bps(1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_fee_must_leave_input() {
        let mut config = AmmConfig::default();
        config.max_fee_bps = 10_000;
        assert!(matches!(config.validate(), Err(AmmError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_price_scale() {
        let mut config = AmmConfig::default();
        config.price_scale = 0;
        assert!(matches!(config.validate(), Err(AmmError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AmmConfig =
            serde_json::from_str(r#"{ "fee_bps": 0, "minimum_liquidity": 0 }"#).unwrap();

        assert_eq!(config.fee_bps, 0);
        assert_eq!(config.minimum_liquidity, 0);
        assert!(config.enforce_deadline);
        assert_eq!(config.price_scale, PRICE_SCALE);
    }
}
