//! Pool Operations
//!
//! Add liquidity, remove liquidity and swap, each executed as one atomic
//! unit under the pair's lock:
//!
//! 1. Guards: deadline, asset identifiers, recipient, amounts
//! 2. Load the pool and compute the candidate state on a copy
//! 3. Check the candidate's invariants
//! 4. Execute the transfer legs through a [`TransferJournal`]
//! 5. Write the candidate to the store
//! 6. Emit the event
//!
//! Failure in steps 1-3 leaves everything untouched. Failure in 4 or 5
//! compensates the legs that already ran, so nothing is committed.

use lib_types::{Address, Amount, AssetId, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::AmmConfig;
use crate::errors::{AmmError, AmmResult};
use crate::events::{EventSink, LedgerEvent, TracingEventSink};
use crate::liquidity::{mint_units, optimal_amounts, withdrawal_amounts};
use crate::locks::PairLocks;
use crate::pair::{canon, PairKey, ReserveOrder};
use crate::pool::Pool;
use crate::pricing;
use crate::store::PoolStore;
use crate::transfer::{AssetTransfer, TransferJournal, TransferLeg};

// ============================================================================
// PARAMETERS & RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityParams {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub amount_a_desired: Amount,
    pub amount_b_desired: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    /// Account paying both assets
    pub caller: Address,
    /// Account credited with the minted units
    pub recipient: Address,
    pub deadline: Timestamp,
}

/// Amounts actually deposited, in the caller's (a, b) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityResult {
    pub amount_a: Amount,
    pub amount_b: Amount,
    pub units_minted: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityParams {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    /// Units to burn from the caller's balance
    pub units: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    pub caller: Address,
    /// Account receiving both assets
    pub recipient: Address,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityResult {
    pub amount_a: Amount,
    pub amount_b: Amount,
    pub units_burned: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactInParams {
    pub amount_in: Amount,
    pub amount_out_min: Amount,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub caller: Address,
    pub recipient: Address,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactOutParams {
    pub amount_out: Amount,
    pub amount_in_max: Amount,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub caller: Address,
    pub recipient: Address,
    pub deadline: Timestamp,
}

/// Outcome of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub amount_in: Amount,
    pub amount_out: Amount,
    /// Reserve of the input asset after the swap
    pub reserve_in: Amount,
    /// Reserve of the output asset after the swap
    pub reserve_out: Amount,
}

// ============================================================================
// LEDGER
// ============================================================================

/// The liquidity-pool ledger service
///
/// Owns the pool store and the transfer capability. All state changes go
/// through the atomic operations below; reads are in [`crate::queries`].
pub struct AmmLedger<S: PoolStore, T: AssetTransfer> {
    config: AmmConfig,
    custody: Address,
    store: S,
    transfers: T,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    locks: PairLocks,
}

impl<S: PoolStore, T: AssetTransfer> AmmLedger<S, T> {
    /// Create a ledger whose pools hold assets in `custody`
    ///
    /// Events go to [`TracingEventSink`] and time comes from
    /// [`SystemClock`] unless overridden.
    ///
    /// # Errors
    /// - `InvalidConfig`: the configuration fails validation
    pub fn new(config: AmmConfig, custody: Address, store: S, transfers: T) -> AmmResult<Self> {
        config.validate()?;
        if custody.is_zero() {
            return Err(AmmError::InvalidConfig(
                "custody account cannot be the null address".to_string(),
            ));
        }

        Ok(Self {
            config,
            custody,
            store,
            transfers,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
            locks: PairLocks::new(),
        })
    }

    /// Replace the event sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replace the clock used for deadline checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AmmConfig {
        &self.config
    }

    /// Account that holds pooled assets
    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transfers(&self) -> &T {
        &self.transfers
    }

    // ========================================================================
    // ADD LIQUIDITY
    // ========================================================================

    /// Deposit both assets and mint liquidity units to the recipient
    ///
    /// On a non-empty pool the deposit is reduced to the current reserve
    /// ratio before minting. On an empty pool the desired amounts are used
    /// as-is and the pool is bootstrapped.
    ///
    /// # Errors
    /// - `Expired`, `InvalidAsset`, `InvalidRecipient`, `InvalidAmount`
    /// - `SlippageA` / `SlippageB`: ratio-adjusted amount below minimum
    /// - `MinimumLiquidity` / `ZeroLiquidityMinted`
    /// - `TransferFailed`: either deposit leg failed (nothing is kept)
    pub fn add_liquidity(&self, params: AddLiquidityParams) -> AmmResult<AddLiquidityResult> {
        report("add_liquidity", self.try_add_liquidity(&params))
    }

    fn try_add_liquidity(&self, params: &AddLiquidityParams) -> AmmResult<AddLiquidityResult> {
        self.check_deadline(params.deadline)?;
        let (key, order) = resolve_pair(&params.asset_a, &params.asset_b)?;
        check_recipient(&params.recipient)?;
        if params.amount_a_desired == 0 || params.amount_b_desired == 0 {
            return Err(AmmError::InvalidAmount(
                "desired deposit amounts must be non-zero".to_string(),
            ));
        }

        self.locks.with_pair(&key, || {
            let pool = self.store.get(&key)?;
            let (amount_a, amount_b) = if pool.is_empty() {
                (params.amount_a_desired, params.amount_b_desired)
            } else {
                optimal_amounts(
                    (params.amount_a_desired, params.amount_b_desired),
                    (params.amount_a_min, params.amount_b_min),
                    order.to_caller_order(pool.reserves),
                )?
            };

            let amounts = order.to_canonical(amount_a, amount_b);
            let minted = mint_units(&pool, amounts, self.config.minimum_liquidity)?;
            tracing::debug!(
                "add_liquidity: pair {} deposit {}/{} mints {} (locked {})",
                key,
                amount_a,
                amount_b,
                minted.units,
                minted.locked
            );

            let mut candidate = pool.clone();
            candidate.deposit(0, amounts[0])?;
            candidate.deposit(1, amounts[1])?;
            candidate.credit(Address::zero(), minted.locked)?;
            candidate.credit(params.recipient, minted.units)?;

            self.commit(
                &key,
                &candidate,
                &[
                    TransferLeg::In {
                        asset: params.asset_a,
                        from: params.caller,
                        amount: amount_a,
                    },
                    TransferLeg::In {
                        asset: params.asset_b,
                        from: params.caller,
                        amount: amount_b,
                    },
                ],
            )?;

            self.events.emit(&LedgerEvent::LiquidityAdded {
                pair: key,
                holder: params.recipient,
                asset_a: params.asset_a,
                asset_b: params.asset_b,
                amount_a,
                amount_b,
                units_minted: minted.units,
            });

            Ok(AddLiquidityResult {
                amount_a,
                amount_b,
                units_minted: minted.units,
            })
        })
    }

    // ========================================================================
    // REMOVE LIQUIDITY
    // ========================================================================

    /// Burn the caller's units and pay out the proportional share of both
    /// reserves to the recipient
    ///
    /// # Errors
    /// - `Expired`, `InvalidAsset`, `InvalidRecipient`
    /// - `InvalidAmount`: zero units, or a share that rounds down to zero
    /// - `EmptyPool`, `InsufficientLiquidity`
    /// - `SlippageA` / `SlippageB`: payout below minimum
    /// - `TransferFailed`: either payout leg failed (nothing is kept)
    pub fn remove_liquidity(
        &self,
        params: RemoveLiquidityParams,
    ) -> AmmResult<RemoveLiquidityResult> {
        report("remove_liquidity", self.try_remove_liquidity(&params))
    }

    fn try_remove_liquidity(
        &self,
        params: &RemoveLiquidityParams,
    ) -> AmmResult<RemoveLiquidityResult> {
        self.check_deadline(params.deadline)?;
        let (key, order) = resolve_pair(&params.asset_a, &params.asset_b)?;
        check_recipient(&params.recipient)?;
        if params.units == 0 {
            return Err(AmmError::InvalidAmount("units to burn cannot be zero".to_string()));
        }

        self.locks.with_pair(&key, || {
            let pool = self.store.get(&key)?;
            if pool.is_empty() {
                return Err(AmmError::EmptyPool);
            }
            // Units locked to the null holder are never withdrawable
            let have = if params.caller.is_zero() {
                0
            } else {
                pool.liquidity_of(&params.caller)
            };
            if have < params.units {
                return Err(AmmError::InsufficientLiquidity {
                    have,
                    need: params.units,
                });
            }

            let amounts = withdrawal_amounts(&pool, params.units)?;
            let (amount_a, amount_b) = order.to_caller_order(amounts);
            tracing::debug!(
                "remove_liquidity: pair {} burn {} returns {}/{}",
                key,
                params.units,
                amount_a,
                amount_b
            );

            if amount_a < params.amount_a_min {
                return Err(AmmError::SlippageA {
                    actual: amount_a,
                    minimum: params.amount_a_min,
                });
            }
            if amount_b < params.amount_b_min {
                return Err(AmmError::SlippageB {
                    actual: amount_b,
                    minimum: params.amount_b_min,
                });
            }
            if amount_a == 0 || amount_b == 0 {
                return Err(AmmError::InvalidAmount(format!(
                    "burning {} units returns nothing of one asset",
                    params.units
                )));
            }

            let mut candidate = pool.clone();
            candidate.debit(&params.caller, params.units)?;
            candidate.withdraw(0, amounts[0])?;
            candidate.withdraw(1, amounts[1])?;

            self.commit(
                &key,
                &candidate,
                &[
                    TransferLeg::Out {
                        asset: params.asset_a,
                        to: params.recipient,
                        amount: amount_a,
                    },
                    TransferLeg::Out {
                        asset: params.asset_b,
                        to: params.recipient,
                        amount: amount_b,
                    },
                ],
            )?;

            self.events.emit(&LedgerEvent::LiquidityRemoved {
                pair: key,
                holder: params.caller,
                asset_a: params.asset_a,
                asset_b: params.asset_b,
                amount_a,
                amount_b,
                units_burned: params.units,
            });

            Ok(RemoveLiquidityResult {
                amount_a,
                amount_b,
                units_burned: params.units,
            })
        })
    }

    // ========================================================================
    // SWAPS
    // ========================================================================

    /// Swap an exact input amount for as much output as the pool gives
    ///
    /// # Errors
    /// - `Expired`, `InvalidAsset`, `InvalidRecipient`
    /// - `InvalidAmount`: zero input, or an output that rounds to zero
    /// - `EmptyPool`
    /// - `SlippageOut`: output below `amount_out_min`
    /// - `ReserveExhausted`: output would drain the reserve
    /// - `TransferFailed`: either leg failed (nothing is kept)
    pub fn swap_exact_in(&self, params: SwapExactInParams) -> AmmResult<SwapResult> {
        report("swap_exact_in", self.try_swap_exact_in(&params))
    }

    fn try_swap_exact_in(&self, params: &SwapExactInParams) -> AmmResult<SwapResult> {
        self.check_deadline(params.deadline)?;
        let (key, order) = resolve_pair(&params.asset_in, &params.asset_out)?;
        check_recipient(&params.recipient)?;
        if params.amount_in == 0 {
            return Err(AmmError::InvalidAmount("input amount cannot be zero".to_string()));
        }

        self.locks.with_pair(&key, || {
            let pool = self.store.get(&key)?;
            if pool.is_empty() {
                return Err(AmmError::EmptyPool);
            }
            let (reserve_in, reserve_out) = order.to_caller_order(pool.reserves);

            let amount_out =
                pricing::amount_out(params.amount_in, reserve_in, reserve_out, self.config.fee_bps)?;
            tracing::debug!(
                "swap_exact_in: pair {} in {} out {} (reserves {}/{})",
                key,
                params.amount_in,
                amount_out,
                reserve_in,
                reserve_out
            );

            if amount_out < params.amount_out_min {
                return Err(AmmError::SlippageOut {
                    actual: amount_out,
                    minimum: params.amount_out_min,
                });
            }
            if amount_out >= reserve_out {
                return Err(AmmError::ReserveExhausted {
                    amount_out,
                    reserve: reserve_out,
                });
            }
            if amount_out == 0 {
                return Err(AmmError::InvalidAmount(format!(
                    "input {} is too small to produce any output",
                    params.amount_in
                )));
            }

            self.execute_swap(
                key,
                order,
                &pool,
                SwapLegs {
                    asset_in: params.asset_in,
                    asset_out: params.asset_out,
                    amount_in: params.amount_in,
                    amount_out,
                    caller: params.caller,
                    recipient: params.recipient,
                },
            )
        })
    }

    /// Swap as little input as needed for an exact output amount
    ///
    /// # Errors
    /// - `Expired`, `InvalidAsset`, `InvalidRecipient`
    /// - `InvalidAmount`: zero output
    /// - `EmptyPool`
    /// - `ReserveExhausted`: requested output would drain the reserve
    /// - `SlippageIn`: required input above `amount_in_max`
    /// - `TransferFailed`: either leg failed (nothing is kept)
    pub fn swap_exact_out(&self, params: SwapExactOutParams) -> AmmResult<SwapResult> {
        report("swap_exact_out", self.try_swap_exact_out(&params))
    }

    fn try_swap_exact_out(&self, params: &SwapExactOutParams) -> AmmResult<SwapResult> {
        self.check_deadline(params.deadline)?;
        let (key, order) = resolve_pair(&params.asset_in, &params.asset_out)?;
        check_recipient(&params.recipient)?;
        if params.amount_out == 0 {
            return Err(AmmError::InvalidAmount("output amount cannot be zero".to_string()));
        }

        self.locks.with_pair(&key, || {
            let pool = self.store.get(&key)?;
            if pool.is_empty() {
                return Err(AmmError::EmptyPool);
            }
            let (reserve_in, reserve_out) = order.to_caller_order(pool.reserves);

            let amount_in =
                pricing::amount_in(params.amount_out, reserve_in, reserve_out, self.config.fee_bps)?;
            tracing::debug!(
                "swap_exact_out: pair {} out {} needs in {} (reserves {}/{})",
                key,
                params.amount_out,
                amount_in,
                reserve_in,
                reserve_out
            );

            if amount_in > params.amount_in_max {
                return Err(AmmError::SlippageIn {
                    required: amount_in,
                    maximum: params.amount_in_max,
                });
            }

            self.execute_swap(
                key,
                order,
                &pool,
                SwapLegs {
                    asset_in: params.asset_in,
                    asset_out: params.asset_out,
                    amount_in,
                    amount_out: params.amount_out,
                    caller: params.caller,
                    recipient: params.recipient,
                },
            )
        })
    }

    /// Path-based form of [`AmmLedger::swap_exact_in`]
    ///
    /// Only direct swaps are supported, so `path` must name exactly the
    /// input and output asset.
    ///
    /// # Errors
    /// - `InvalidPath`: `path.len() != 2`
    /// - everything [`AmmLedger::swap_exact_in`] returns
    pub fn swap_exact_tokens_for_tokens(
        &self,
        amount_in: Amount,
        amount_out_min: Amount,
        path: &[AssetId],
        caller: Address,
        recipient: Address,
        deadline: Timestamp,
    ) -> AmmResult<SwapResult> {
        let (asset_in, asset_out) = match path {
            [asset_in, asset_out] => (*asset_in, *asset_out),
            _ => {
                return report(
                    "swap_exact_tokens_for_tokens",
                    Err(AmmError::InvalidPath(path.len())),
                )
            }
        };

        self.swap_exact_in(SwapExactInParams {
            amount_in,
            amount_out_min,
            asset_in,
            asset_out,
            caller,
            recipient,
            deadline,
        })
    }

    fn execute_swap(
        &self,
        key: PairKey,
        order: ReserveOrder,
        pool: &Pool,
        legs: SwapLegs,
    ) -> AmmResult<SwapResult> {
        // Slot of asset_in is slot_of_a because asset_in was passed first
        let slot_in = order.slot_of_a();
        let slot_out = 1 - slot_in;

        let mut candidate = pool.clone();
        candidate.deposit(slot_in, legs.amount_in)?;
        candidate.withdraw(slot_out, legs.amount_out)?;

        let k_before = pool.product();
        let k_after = candidate.product();
        if k_after < k_before {
            return Err(AmmError::InvariantViolation(format!(
                "swap on {} decreased product from {} to {}",
                key, k_before, k_after
            )));
        }

        self.commit(
            &key,
            &candidate,
            &[
                TransferLeg::In {
                    asset: legs.asset_in,
                    from: legs.caller,
                    amount: legs.amount_in,
                },
                TransferLeg::Out {
                    asset: legs.asset_out,
                    to: legs.recipient,
                    amount: legs.amount_out,
                },
            ],
        )?;

        self.events.emit(&LedgerEvent::Swap {
            pair: key,
            trader: legs.caller,
            asset_in: legs.asset_in,
            asset_out: legs.asset_out,
            amount_in: legs.amount_in,
            amount_out: legs.amount_out,
        });

        Ok(SwapResult {
            amount_in: legs.amount_in,
            amount_out: legs.amount_out,
            reserve_in: candidate.reserves[slot_in],
            reserve_out: candidate.reserves[slot_out],
        })
    }

    // ========================================================================
    // COMMIT
    // ========================================================================

    /// Run `legs`, then persist `candidate`; undo the legs if either step fails
    fn commit(&self, key: &PairKey, candidate: &Pool, legs: &[TransferLeg]) -> AmmResult<()> {
        candidate.check_invariants()?;

        let mut journal = TransferJournal::new(&self.transfers, self.custody);
        for leg in legs {
            if let Err(e) = journal.execute(*leg) {
                let unwound = journal.completed().len();
                let failed = journal.rollback();
                tracing::warn!(
                    "Rolled back {} transfer leg(s) on {} ({} compensation failures): {}",
                    unwound,
                    key,
                    failed,
                    e
                );
                return Err(e);
            }
        }

        if let Err(e) = self.store.put(key, candidate) {
            let failed = journal.rollback();
            tracing::warn!(
                "Store write failed for {}, transfers rolled back ({} compensation failures): {}",
                key,
                failed,
                e
            );
            return Err(e);
        }

        journal.commit();
        Ok(())
    }

    // ========================================================================
    // GUARDS
    // ========================================================================

    fn check_deadline(&self, deadline: Timestamp) -> AmmResult<()> {
        if !self.config.enforce_deadline {
            return Ok(());
        }
        let now = self.clock.now();
        if now > deadline {
            return Err(AmmError::Expired { deadline, now });
        }
        Ok(())
    }

    /// Load the pool for a caller-ordered pair without locking
    pub(crate) fn load(
        &self,
        a: &AssetId,
        b: &AssetId,
    ) -> AmmResult<(PairKey, ReserveOrder, Pool)> {
        let (key, order) = resolve_pair(a, b)?;
        let pool = self.store.get(&key)?;
        Ok((key, order, pool))
    }
}

/// Everything a swap moves, resolved before commit
struct SwapLegs {
    asset_in: AssetId,
    asset_out: AssetId,
    amount_in: Amount,
    amount_out: Amount,
    caller: Address,
    recipient: Address,
}

/// Validate the asset identifiers and resolve the pair
fn resolve_pair(a: &AssetId, b: &AssetId) -> AmmResult<(PairKey, ReserveOrder)> {
    if a.is_null() || b.is_null() {
        return Err(AmmError::InvalidAsset("null asset identifier".to_string()));
    }
    if a == b {
        return Err(AmmError::InvalidAsset(format!("{} paired with itself", a)));
    }
    canon(a, b)
}

fn check_recipient(recipient: &Address) -> AmmResult<()> {
    if recipient.is_zero() {
        return Err(AmmError::InvalidRecipient);
    }
    Ok(())
}

/// Log the outcome of a public operation
fn report<R: std::fmt::Debug>(operation: &str, result: AmmResult<R>) -> AmmResult<R> {
    match &result {
        Ok(outcome) => tracing::debug!("{} committed: {:?}", operation, outcome),
        Err(e) if e.is_fatal() => {
            tracing::error!("{} aborted on invariant violation: {}", operation, e)
        }
        Err(e) if matches!(e, AmmError::TransferFailed { .. } | AmmError::Storage(_)) => {
            tracing::warn!("{} failed: {}", operation, e)
        }
        Err(e) => tracing::debug!("{} rejected: {}", operation, e),
    }
    result
}
