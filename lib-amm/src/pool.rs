//! Pool state: canonical reserves, issued liquidity units and per-holder balances.

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{AmmError, AmmResult};
use crate::math::{self, U256};

/// State of one pair
///
/// `reserves` are stored in canonical slot order (smaller asset first).
/// A pool that was never written to is indistinguishable from
/// `Pool::default()`, which is how implicit creation works.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Reserve of each asset, canonical order
    pub reserves: [Amount; 2],
    /// Total outstanding liquidity units
    pub total_liquidity: Amount,
    /// Liquidity units per holder (zero balances are not stored)
    liquidity_of: BTreeMap<Address, Amount>,
}

impl Pool {
    /// Whether the pool holds no liquidity (fresh or fully withdrawn)
    pub fn is_empty(&self) -> bool {
        self.total_liquidity == 0
    }

    /// Liquidity units held by `holder`
    pub fn liquidity_of(&self, holder: &Address) -> Amount {
        self.liquidity_of.get(holder).copied().unwrap_or(0)
    }

    /// Iterate holders with a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.liquidity_of.iter()
    }

    /// Current constant product `reserve[0] * reserve[1]`
    pub fn product(&self) -> U256 {
        math::product(self.reserves[0], self.reserves[1])
    }

    /// Mint `units` to `holder`, raising the total supply
    pub fn credit(&mut self, holder: Address, units: Amount) -> AmmResult<()> {
        if units == 0 {
            return Ok(());
        }
        let total = self
            .total_liquidity
            .checked_add(units)
            .ok_or(AmmError::Overflow)?;
        let balance = self
            .liquidity_of(&holder)
            .checked_add(units)
            .ok_or(AmmError::Overflow)?;
        self.liquidity_of.insert(holder, balance);
        self.total_liquidity = total;
        Ok(())
    }

    /// Burn `units` from `holder`, lowering the total supply
    ///
    /// # Errors
    /// - `InsufficientLiquidity`: holder owns fewer than `units`
    pub fn debit(&mut self, holder: &Address, units: Amount) -> AmmResult<()> {
        let have = self.liquidity_of(holder);
        if have < units {
            return Err(AmmError::InsufficientLiquidity { have, need: units });
        }
        let total = self.total_liquidity.checked_sub(units).ok_or_else(|| {
            AmmError::InvariantViolation(format!(
                "burn of {} exceeds total liquidity {}",
                units, self.total_liquidity
            ))
        })?;

        let remaining = have - units;
        if remaining == 0 {
            self.liquidity_of.remove(holder);
        } else {
            self.liquidity_of.insert(*holder, remaining);
        }
        self.total_liquidity = total;
        Ok(())
    }

    /// Add to one canonical reserve slot
    pub fn deposit(&mut self, slot: usize, amount: Amount) -> AmmResult<()> {
        self.reserves[slot] = self.reserves[slot]
            .checked_add(amount)
            .ok_or(AmmError::Overflow)?;
        Ok(())
    }

    /// Remove from one canonical reserve slot
    ///
    /// Taking more than the reserve holds is a ledger bug, not a caller error.
    pub fn withdraw(&mut self, slot: usize, amount: Amount) -> AmmResult<()> {
        self.reserves[slot] = self.reserves[slot].checked_sub(amount).ok_or_else(|| {
            AmmError::InvariantViolation(format!(
                "withdrawal of {} exceeds reserve {} in slot {}",
                amount, self.reserves[slot], slot
            ))
        })?;
        Ok(())
    }

    /// Verify the structural invariants that must hold at every commit
    pub fn check_invariants(&self) -> AmmResult<()> {
        let reserves_empty = self.reserves[0] == 0 && self.reserves[1] == 0;
        if reserves_empty != self.is_empty() {
            return Err(AmmError::InvariantViolation(format!(
                "reserves {:?} inconsistent with total liquidity {}",
                self.reserves, self.total_liquidity
            )));
        }
        if !self.is_empty() && (self.reserves[0] == 0 || self.reserves[1] == 0) {
            return Err(AmmError::InvariantViolation(format!(
                "one-sided reserves {:?} with liquidity outstanding",
                self.reserves
            )));
        }

        let mut sum: Amount = 0;
        for units in self.liquidity_of.values() {
            sum = sum.checked_add(*units).ok_or(AmmError::Overflow)?;
        }
        if sum != self.total_liquidity {
            return Err(AmmError::InvariantViolation(format!(
                "holder balances sum to {} but total liquidity is {}",
                sum, self.total_liquidity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(id: u8) -> Address {
        Address::new([id; 32])
    }

    #[test]
    fn test_default_pool_is_empty_and_consistent() {
        let pool = Pool::default();
        assert!(pool.is_empty());
        assert_eq!(pool.liquidity_of(&holder(1)), 0);
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn test_credit_and_debit_track_total() {
        let mut pool = Pool::default();
        pool.credit(holder(1), 700).unwrap();
        pool.credit(holder(2), 300).unwrap();
        assert_eq!(pool.total_liquidity, 1000);

        pool.debit(&holder(1), 200).unwrap();
        assert_eq!(pool.liquidity_of(&holder(1)), 500);
        assert_eq!(pool.total_liquidity, 800);
    }

    #[test]
    fn test_debit_to_zero_removes_holder() {
        let mut pool = Pool::default();
        pool.credit(holder(1), 10).unwrap();
        pool.debit(&holder(1), 10).unwrap();

        assert_eq!(pool.holders().count(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_debit_insufficient() {
        let mut pool = Pool::default();
        pool.credit(holder(1), 10).unwrap();

        let result = pool.debit(&holder(1), 11);
        assert_eq!(result, Err(AmmError::InsufficientLiquidity { have: 10, need: 11 }));
        assert_eq!(pool.total_liquidity, 10);
    }

    #[test]
    fn test_withdraw_beyond_reserve_is_fatal() {
        let mut pool = Pool::default();
        pool.deposit(0, 5).unwrap();

        let err = pool.withdraw(0, 6).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(pool.reserves[0], 5);
    }

    #[test]
    fn test_invariants_detect_orphaned_reserves() {
        let mut pool = Pool::default();
        pool.deposit(0, 5).unwrap();
        pool.deposit(1, 5).unwrap();

        assert!(pool.check_invariants().unwrap_err().is_fatal());
    }

    #[test]
    fn test_invariants_detect_one_sided_reserves() {
        let mut pool = Pool::default();
        pool.deposit(0, 5).unwrap();
        pool.credit(holder(1), 5).unwrap();

        assert!(pool.check_invariants().unwrap_err().is_fatal());
    }

    #[test]
    fn test_invariants_hold_for_funded_pool() {
        let mut pool = Pool::default();
        pool.deposit(0, 1_000).unwrap();
        pool.deposit(1, 4_000).unwrap();
        pool.credit(holder(1), 2_000).unwrap();

        assert!(pool.check_invariants().is_ok());
        assert_eq!(pool.product(), U256::from(4_000_000u64));
    }
}
