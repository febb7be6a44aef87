//! Price/Quote Queries
//!
//! Read-only views over the ledger. Nothing here takes a pair lock or
//! writes state; each query reads one consistent pool snapshot from the
//! store.

use lib_types::{Address, Amount, AssetId};
use serde::{Deserialize, Serialize};

use crate::errors::{AmmError, AmmResult};
use crate::ledger::AmmLedger;
use crate::liquidity::withdrawal_amounts;
use crate::pair::PairKey;
use crate::pricing;
use crate::store::PoolStore;
use crate::transfer::AssetTransfer;

/// Snapshot of one pool, reserves in the caller's (a, b) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolView {
    pub key: PairKey,
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub reserve_a: Amount,
    pub reserve_b: Amount,
    pub total_liquidity: Amount,
}

impl<S: PoolStore, T: AssetTransfer> AmmLedger<S, T> {
    /// Reserves of `a` and `b`, in that order
    pub fn get_reserves(&self, a: &AssetId, b: &AssetId) -> AmmResult<(Amount, Amount)> {
        let (_, order, pool) = self.load(a, b)?;
        Ok(order.to_caller_order(pool.reserves))
    }

    /// Liquidity units `holder` owns in the pool of `a` and `b`
    pub fn get_liquidity_balance(
        &self,
        a: &AssetId,
        b: &AssetId,
        holder: &Address,
    ) -> AmmResult<Amount> {
        let (_, _, pool) = self.load(a, b)?;
        Ok(pool.liquidity_of(holder))
    }

    pub fn get_total_liquidity(&self, a: &AssetId, b: &AssetId) -> AmmResult<Amount> {
        let (_, _, pool) = self.load(a, b)?;
        Ok(pool.total_liquidity)
    }

    /// Price of `a` in units of `b`, scaled by the configured price scale
    ///
    /// # Errors
    /// - `EmptyPool`: either reserve is zero
    pub fn spot_price(&self, a: &AssetId, b: &AssetId) -> AmmResult<Amount> {
        let (reserve_a, reserve_b) = self.get_reserves(a, b)?;
        pricing::spot_price(reserve_a, reserve_b, self.config().price_scale)
    }

    /// Fee-free output for explicit reserves
    pub fn quote_amount_out(
        &self,
        amount_in: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
    ) -> AmmResult<Amount> {
        pricing::quote_amount_out(amount_in, reserve_in, reserve_out)
    }

    /// Output a swap of `amount_in` would receive right now, fee included
    pub fn quote_amount_out_with_fee(
        &self,
        amount_in: Amount,
        asset_in: &AssetId,
        asset_out: &AssetId,
    ) -> AmmResult<Amount> {
        let (_, order, pool) = self.load(asset_in, asset_out)?;
        if pool.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        let (reserve_in, reserve_out) = order.to_caller_order(pool.reserves);
        pricing::amount_out(amount_in, reserve_in, reserve_out, self.config().fee_bps)
    }

    /// Input needed right now to receive exactly `amount_out`, fee included
    pub fn quote_amount_in(
        &self,
        amount_out: Amount,
        asset_in: &AssetId,
        asset_out: &AssetId,
    ) -> AmmResult<Amount> {
        let (_, order, pool) = self.load(asset_in, asset_out)?;
        if pool.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        let (reserve_in, reserve_out) = order.to_caller_order(pool.reserves);
        pricing::amount_in(amount_out, reserve_in, reserve_out, self.config().fee_bps)
    }

    pub fn get_pool(&self, a: &AssetId, b: &AssetId) -> AmmResult<PoolView> {
        let (key, order, pool) = self.load(a, b)?;
        let (reserve_a, reserve_b) = order.to_caller_order(pool.reserves);

        Ok(PoolView {
            key,
            asset_a: *a,
            asset_b: *b,
            reserve_a,
            reserve_b,
            total_liquidity: pool.total_liquidity,
        })
    }

    /// Every pair the ledger has written, in key order
    pub fn pairs(&self) -> AmmResult<Vec<PairKey>> {
        self.store().keys()
    }

    /// Amounts of `a` and `b` that burning `units` would return right now
    ///
    /// # Errors
    /// - `EmptyPool`, `InsufficientLiquidity`
    pub fn quote_remove_liquidity(
        &self,
        a: &AssetId,
        b: &AssetId,
        units: Amount,
    ) -> AmmResult<(Amount, Amount)> {
        let (_, order, pool) = self.load(a, b)?;
        let amounts = withdrawal_amounts(&pool, units)?;
        Ok(order.to_caller_order(amounts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmmConfig;
    use crate::ledger::AddLiquidityParams;
    use crate::pair::canon;
    use crate::store::MemoryPoolStore;
    use crate::transfer::InMemoryBalances;
    use crate::PRICE_SCALE;

    fn asset(id: u8) -> AssetId {
        AssetId::new([id; 32])
    }

    fn account(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn funded_ledger() -> AmmLedger<MemoryPoolStore, InMemoryBalances> {
        let balances = InMemoryBalances::new(account(0xCC));
        balances.mint(&asset(1), &account(1), 10_000_000);
        balances.mint(&asset(2), &account(1), 10_000_000);

        let ledger = AmmLedger::new(
            AmmConfig::for_testing(),
            account(0xCC),
            MemoryPoolStore::new(),
            balances,
        )
        .unwrap();

        ledger
            .add_liquidity(AddLiquidityParams {
                asset_a: asset(1),
                asset_b: asset(2),
                amount_a_desired: 1_000_000,
                amount_b_desired: 4_000_000,
                amount_a_min: 0,
                amount_b_min: 0,
                caller: account(1),
                recipient: account(1),
                deadline: 0,
            })
            .unwrap();
        ledger
    }

    #[test]
    fn test_reserves_follow_caller_order() {
        let ledger = funded_ledger();

        assert_eq!(ledger.get_reserves(&asset(1), &asset(2)).unwrap(), (1_000_000, 4_000_000));
        assert_eq!(ledger.get_reserves(&asset(2), &asset(1)).unwrap(), (4_000_000, 1_000_000));
    }

    #[test]
    fn test_balances_and_total() {
        let ledger = funded_ledger();

        assert_eq!(ledger.get_total_liquidity(&asset(2), &asset(1)).unwrap(), 2_000_000);
        assert_eq!(
            ledger.get_liquidity_balance(&asset(1), &asset(2), &account(1)).unwrap(),
            2_000_000
        );
        assert_eq!(ledger.get_liquidity_balance(&asset(1), &asset(2), &account(2)).unwrap(), 0);
    }

    #[test]
    fn test_spot_price_both_directions() {
        let ledger = funded_ledger();

        assert_eq!(ledger.spot_price(&asset(1), &asset(2)).unwrap(), 4 * PRICE_SCALE);
        assert_eq!(ledger.spot_price(&asset(2), &asset(1)).unwrap(), PRICE_SCALE / 4);
    }

    #[test]
    fn test_spot_price_empty_pool() {
        let ledger = funded_ledger();
        assert_eq!(ledger.spot_price(&asset(1), &asset(3)), Err(AmmError::EmptyPool));
    }

    #[test]
    fn test_live_quotes() {
        let ledger = funded_ledger();

        // 4_000_000 * 100_000 / 1_100_000
        assert_eq!(ledger.quote_amount_out_with_fee(100_000, &asset(1), &asset(2)).unwrap(), 363_636);
        assert_eq!(ledger.quote_amount_in(363_636, &asset(1), &asset(2)).unwrap(), 100_000);
        assert_eq!(
            ledger.quote_amount_out_with_fee(1, &asset(1), &asset(3)),
            Err(AmmError::EmptyPool)
        );
    }

    #[test]
    fn test_pool_view_and_pairs() {
        let ledger = funded_ledger();

        let view = ledger.get_pool(&asset(2), &asset(1)).unwrap();
        let (key, _) = canon(&asset(1), &asset(2)).unwrap();
        assert_eq!(view.key, key);
        assert_eq!(view.reserve_a, 4_000_000);
        assert_eq!(view.reserve_b, 1_000_000);
        assert_eq!(ledger.pairs().unwrap(), vec![key]);
    }

    #[test]
    fn test_quote_remove_liquidity() {
        let ledger = funded_ledger();

        assert_eq!(
            ledger.quote_remove_liquidity(&asset(1), &asset(2), 500_000).unwrap(),
            (250_000, 1_000_000)
        );
        assert_eq!(
            ledger.quote_remove_liquidity(&asset(1), &asset(2), 2_000_001),
            Err(AmmError::InsufficientLiquidity { have: 2_000_000, need: 2_000_001 })
        );
    }
}
